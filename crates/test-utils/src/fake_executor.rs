use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use workchain::chain::{ScheduledTask, TaskId, TaskKind, TaskResult};
use workchain::engine::{CoreEvent, RuntimeEvent};
use workchain::errors::Result;
use workchain::exec::ExecutorBackend;

#[derive(Debug, Default)]
struct Script {
    results: HashMap<TaskKind, VecDeque<TaskResult>>,
    held: HashSet<TaskKind>,
    dispatched: Vec<ScheduledTask>,
    stopped: Vec<TaskId>,
    runtime_tx: Option<mpsc::UnboundedSender<RuntimeEvent>>,
}

/// Shared script and log for a [`ScriptedExecutor`].
///
/// - Results are popped per task kind; with nothing scripted an attempt
///   succeeds and echoes its input as output.
/// - Attempts of a held kind are recorded but never complete until
///   [`ExecutorScript::release`] is called.
#[derive(Debug, Clone, Default)]
pub struct ExecutorScript {
    inner: Arc<Mutex<Script>>,
}

impl ExecutorScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: TaskKind, result: TaskResult) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .results
            .entry(kind)
            .or_default()
            .push_back(result);
        self
    }

    pub fn hold(&self, kind: TaskKind) -> &Self {
        self.inner.lock().unwrap().held.insert(kind);
        self
    }

    /// Every attempt dispatched so far, in order.
    pub fn dispatched(&self) -> Vec<ScheduledTask> {
        self.inner.lock().unwrap().dispatched.clone()
    }

    pub fn dispatched_ids(&self) -> Vec<TaskId> {
        self.dispatched().iter().map(|t| t.id).collect()
    }

    /// Every stop request received so far, in order.
    pub fn stopped(&self) -> Vec<TaskId> {
        self.inner.lock().unwrap().stopped.clone()
    }

    /// Complete the latest attempt of `task` with `result`.
    pub fn release(&self, task: TaskId, result: TaskResult) {
        let script = self.inner.lock().unwrap();
        let attempt = script
            .dispatched
            .iter()
            .rev()
            .find(|t| t.id == task)
            .expect("task was never dispatched");
        let tx = script.runtime_tx.as_ref().expect("executor not created");
        let _ = tx.send(
            CoreEvent::TaskCompleted {
                task,
                ticket: attempt.ticket,
                result,
            }
            .into(),
        );
    }

    pub fn executor(&self, runtime_tx: mpsc::UnboundedSender<RuntimeEvent>) -> ScriptedExecutor {
        self.inner.lock().unwrap().runtime_tx = Some(runtime_tx.clone());
        ScriptedExecutor {
            runtime_tx,
            script: self.clone(),
        }
    }
}

/// A fake executor that:
/// - records which attempts were dispatched and stopped
/// - immediately reports `TaskCompleted` with the scripted result.
pub struct ScriptedExecutor {
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
    script: ExecutorScript,
}

impl ExecutorBackend for ScriptedExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let script = self.script.clone();

        Box::pin(async move {
            for t in tasks {
                let result = {
                    let mut guard = script.inner.lock().unwrap();
                    guard.dispatched.push(t.clone());
                    if guard.held.contains(&t.kind) {
                        continue;
                    }
                    guard
                        .results
                        .get_mut(&t.kind)
                        .and_then(VecDeque::pop_front)
                        .unwrap_or_else(|| TaskResult::Success(t.input.clone()))
                };

                let _ = tx.send(
                    CoreEvent::TaskCompleted {
                        task: t.id,
                        ticket: t.ticket,
                        result,
                    }
                    .into(),
                );
            }
            Ok(())
        })
    }

    fn stop_tasks(
        &mut self,
        tasks: Vec<TaskId>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let script = self.script.clone();
        Box::pin(async move {
            script.inner.lock().unwrap().stopped.extend(tasks);
            Ok(())
        })
    }
}
