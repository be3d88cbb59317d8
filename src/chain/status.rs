// src/chain/status.rs

//! Public, read-only views of task and chain state.

use std::fmt;

use crate::chain::data::Data;
use crate::chain::spec::{TaskId, TaskKind};

/// Lifecycle state of a task.
///
/// `Unknown` is never stored; it is what lookups return for ids the scheduler
/// has never seen (or has pruned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Enqueued,
    /// Constraints unmet, or an earlier task in the chain has not finished.
    Blocked,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Unknown,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Enqueued => "ENQUEUED",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one task together with whatever it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// Output data, present once the task has SUCCEEDED.
    pub output: Option<Data>,
    /// Failure message, present once the task has FAILED.
    pub error: Option<String>,
    /// Number of retries granted so far.
    pub retries: u32,
}

/// Point-in-time view of every task bound to a chain name.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    pub chain: String,
    /// Identifies the chain instance; a REPLACE or a fresh submission after
    /// completion produces a new record id.
    pub record: u64,
    pub tasks: Vec<TaskInfo>,
    /// All tasks are SUCCEEDED, FAILED or CANCELLED.
    pub terminal: bool,
}

impl ChainSnapshot {
    pub fn task(&self, id: TaskId) -> Option<&TaskInfo> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn status_of(&self, id: TaskId) -> TaskStatus {
        self.task(id).map_or(TaskStatus::Unknown, |t| t.status)
    }

    pub fn statuses(&self) -> Vec<(TaskId, TaskStatus)> {
        self.tasks.iter().map(|t| (t.id, t.status)).collect()
    }
}

/// One item of an observer feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainUpdate {
    /// Task whose transition produced this update; `None` for the snapshot
    /// replayed to a new subscriber.
    pub changed: Option<TaskId>,
    pub snapshot: ChainSnapshot,
}

impl ChainUpdate {
    /// The changed task's info, if any.
    pub fn changed_task(&self) -> Option<&TaskInfo> {
        self.changed.and_then(|id| self.snapshot.task(id))
    }
}

/// How a submission was resolved against the chain already bound to its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No active chain existed; the new chain started.
    Started,
    /// An active chain existed and was kept; the new chain was discarded.
    Kept,
    /// The active chain was cancelled and the new chain started.
    Replaced,
    /// The new chain will run after the active one.
    Appended,
}

/// Returned by `submit`: the task ids to use for status lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHandle {
    pub chain: String,
    pub record: u64,
    pub task_ids: Vec<TaskId>,
    pub outcome: SubmitOutcome,
}
