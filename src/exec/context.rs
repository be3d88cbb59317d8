// src/exec/context.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::chain::{Data, ScheduledTask, TaskId, TaskKind};
use crate::collab::Collaborators;

/// Shared flag raised when the scheduler no longer wants an attempt's result
/// (cancellation, replacement, constraint loss, shutdown).
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a task body gets to see for one attempt.
#[derive(Debug, Clone)]
pub struct TaskContext {
    id: TaskId,
    chain: String,
    kind: TaskKind,
    attempt: u32,
    input: Data,
    collaborators: Collaborators,
    stop: StopToken,
}

impl TaskContext {
    pub fn new(task: &ScheduledTask, collaborators: Collaborators, stop: StopToken) -> Self {
        Self {
            id: task.id,
            chain: task.chain.clone(),
            kind: task.kind,
            attempt: task.attempt,
            input: task.input.clone(),
            collaborators,
            stop,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn input(&self) -> &Data {
        &self.input
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// The result of this attempt will be discarded; bodies may bail out.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Best-effort foreground notification, delivered on the blocking pool.
    /// Failures are logged and ignored.
    pub async fn notify_foreground(&self, message: impl Into<String>) {
        let notifier = self.collaborators.notifier.clone();
        let (id, message) = (self.id, message.into());
        match tokio::task::spawn_blocking(move || notifier.notify(id, &message)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(task = %id, error = %err, "foreground notification failed"),
            Err(err) => debug!(task = %id, error = %err, "foreground notifier crashed"),
        }
    }
}
