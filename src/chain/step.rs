// src/chain/step.rs

//! Result types for a single chain-table step.

use std::time::Duration;

use crate::chain::data::Data;
use crate::chain::spec::{TaskId, TaskKind};
use crate::chain::status::ChainUpdate;

/// What a task body returns for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Success(Data),
    Failure(String),
    Retry,
}

impl TaskResult {
    pub fn success() -> Self {
        TaskResult::Success(Data::new())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        TaskResult::Failure(message.into())
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskResult::Success(_) => "success",
            TaskResult::Failure(_) => "failure",
            TaskResult::Retry => "retry",
        }
    }
}

/// A task attempt the table wants the executor to run now.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub chain: String,
    pub kind: TaskKind,
    /// Declared input merged with the preceding task's output.
    pub input: Data,
    /// Identifies this attempt; completions carrying an older ticket are
    /// discarded.
    pub ticket: u64,
    /// 1-based attempt number.
    pub attempt: u32,
}

/// Ask the shell to deliver a wake-up for `task` after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeRequest {
    pub task: TaskId,
    pub ticket: u64,
    pub delay: Duration,
}

/// Everything one table operation produced, in transition order.
#[derive(Debug, Clone, Default)]
pub struct ChainStep {
    /// Observer updates, one per state transition.
    pub updates: Vec<ChainUpdate>,
    /// Attempts that became RUNNING.
    pub scheduled: Vec<ScheduledTask>,
    /// Running attempts whose result will be discarded.
    pub stopped: Vec<TaskId>,
    pub wakes: Vec<WakeRequest>,
}

impl ChainStep {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
            && self.scheduled.is_empty()
            && self.stopped.is_empty()
            && self.wakes.is_empty()
    }
}
