// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor in [`executor_loop`](super::executor_loop).
//!
//! - `TokioExecutorBackend` is the default implementation. It forwards
//!   scheduled attempts and stop requests to the executor loop.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::chain::{ScheduledTask, TaskId};
use crate::collab::Collaborators;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, WorkchainError};

use super::executor_loop::{ExecutorMessage, spawn_executor};

/// Trait abstracting how scheduled attempts are executed.
pub trait ExecutorBackend: Send {
    /// Start the given attempts. Each must eventually report a
    /// `TaskCompleted` event unless it is stopped first.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Signal running attempts that their results are no longer wanted.
    fn stop_tasks(
        &mut self,
        tasks: Vec<TaskId>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Executor backend running task bodies as Tokio tasks.
pub struct TokioExecutorBackend {
    tx: mpsc::Sender<ExecutorMessage>,
}

impl TokioExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::UnboundedSender<RuntimeEvent>, collaborators: Collaborators) -> Self {
        let tx = spawn_executor(runtime_tx, collaborators);
        Self { tx }
    }

    fn forward(
        &self,
        message: ExecutorMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();
        Box::pin(async move {
            tx.send(message)
                .await
                .map_err(|_| anyhow!("executor loop has stopped"))?;
            Ok::<(), WorkchainError>(())
        })
    }
}

impl ExecutorBackend for TokioExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.forward(ExecutorMessage::Run(tasks))
    }

    fn stop_tasks(
        &mut self,
        tasks: Vec<TaskId>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.forward(ExecutorMessage::Stop(tasks))
    }
}
