// src/collab/mod.rs

//! External collaborators the task kinds depend on.
//!
//! - [`ByteFetcher`] pulls raw bytes from a source (`download`).
//! - [`ImageTransformer`] turns bytes into other bytes (`blur`, `color_filter`).
//! - [`ArtifactStore`] persists bytes and hands back an opaque locator.
//! - [`ForegroundNotifier`] shows best-effort progress messages.
//!
//! All collaborators are synchronous; task bodies call them from
//! `spawn_blocking` so they never stall other chains.

use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::chain::TaskId;
use crate::fs::RealFileSystem;

pub mod fetch;
pub mod image;
pub mod notify;
pub mod store;

pub use fetch::SourceFetcher;
pub use image::RawImageTransformer;
pub use notify::LogNotifier;
pub use store::FileArtifactStore;

/// Why a fetch failed. The download kind retries on `Server` only.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("server error (HTTP {0})")]
    Server(u16),

    #[error("request rejected (HTTP {0})")]
    Rejected(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("body exceeds {0} bytes")]
    TooLarge(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ByteFetcher: Send + Sync + Debug {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, FetchError>;
}

/// What a transformer should do to the bytes it gets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformParams {
    Blur { radius: usize },
    ColorFilter { scale: f64 },
}

pub trait ImageTransformer: Send + Sync + Debug {
    fn transform(&self, bytes: &[u8], params: TransformParams) -> anyhow::Result<Vec<u8>>;
}

pub trait ArtifactStore: Send + Sync + Debug {
    /// Store `bytes` and return a locator that [`ArtifactStore::load`] accepts.
    fn persist(&self, bytes: &[u8]) -> anyhow::Result<String>;
    fn load(&self, locator: &str) -> anyhow::Result<Vec<u8>>;
}

pub trait ForegroundNotifier: Send + Sync + Debug {
    fn notify(&self, task: TaskId, message: &str) -> anyhow::Result<()>;
}

/// The set of collaborators handed to every task attempt.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn ByteFetcher>,
    pub transformer: Arc<dyn ImageTransformer>,
    pub store: Arc<dyn ArtifactStore>,
    pub notifier: Arc<dyn ForegroundNotifier>,
}

impl Collaborators {
    /// Real network and filesystem collaborators, storing artifacts in `dir`.
    pub fn standard(dir: impl Into<std::path::PathBuf>) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: Arc::new(SourceFetcher::new(RealFileSystem)),
            transformer: Arc::new(RawImageTransformer),
            store: Arc::new(FileArtifactStore::new(RealFileSystem, dir)?),
            notifier: Arc::new(LogNotifier),
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ByteFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn ImageTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ForegroundNotifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
