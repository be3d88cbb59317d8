use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use workchain::chain::TaskId;
use workchain::collab::{
    ByteFetcher, Collaborators, FetchError, FileArtifactStore, ForegroundNotifier,
    RawImageTransformer,
};
use workchain::fs::MockFileSystem;

/// Directory used by [`memory_collaborators`] for stored artifacts.
pub const ARTIFACT_DIR: &str = "/artifacts";

/// One scripted fetch outcome.
#[derive(Debug, Clone)]
pub enum FetchStep {
    Bytes(Vec<u8>),
    Server(u16),
    Rejected(u16),
    Transport(String),
}

/// A fetcher that replays scripted outcomes in order.
///
/// Once the script is exhausted every fetch fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<FetchStep>>,
    sources: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(steps: impl IntoIterator<Item = FetchStep>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// The first fetch returns `bytes`.
    pub fn ok(bytes: &[u8]) -> Self {
        Self::new([FetchStep::Bytes(bytes.to_vec())])
    }

    /// Sources requested so far, in order.
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.sources.lock().unwrap().len()
    }
}

impl ByteFetcher for ScriptedFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, FetchError> {
        self.sources.lock().unwrap().push(source.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(FetchStep::Bytes(bytes)) => Ok(bytes),
            Some(FetchStep::Server(code)) => Err(FetchError::Server(code)),
            Some(FetchStep::Rejected(code)) => Err(FetchError::Rejected(code)),
            Some(FetchStep::Transport(msg)) => Err(FetchError::Transport(msg)),
            None => Err(FetchError::Transport("no scripted response left".to_string())),
        }
    }
}

/// A notifier that records every message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(TaskId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(TaskId, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_for(&self, task: TaskId) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(id, _)| *id == task)
            .map(|(_, msg)| msg)
            .collect()
    }
}

impl ForegroundNotifier for RecordingNotifier {
    fn notify(&self, task: TaskId, message: &str) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((task, message.to_string()));
        Ok(())
    }
}

/// Handles to the fakes behind a [`Collaborators`] built by
/// [`memory_collaborators`].
#[derive(Debug, Clone)]
pub struct MemoryCollab {
    pub collaborators: Collaborators,
    pub fs: MockFileSystem,
    pub fetcher: Arc<ScriptedFetcher>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Collaborators backed by an in-memory filesystem and a scripted fetcher.
pub fn memory_collaborators(fetcher: ScriptedFetcher) -> MemoryCollab {
    let fs = MockFileSystem::new();
    let fetcher = Arc::new(fetcher);
    let notifier = Arc::new(RecordingNotifier::new());
    let store = FileArtifactStore::new(fs.clone(), ARTIFACT_DIR).expect("artifact dir is valid");

    let collaborators = Collaborators {
        fetcher: fetcher.clone(),
        transformer: Arc::new(RawImageTransformer),
        store: Arc::new(store),
        notifier: notifier.clone(),
    };

    MemoryCollab {
        collaborators,
        fs,
        fetcher,
        notifier,
    }
}
