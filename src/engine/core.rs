// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes submissions and [`CoreEvent`]s and produces:
//! - an updated chain table
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor and arming timers
//! - maintaining the status board and observer feeds
//!
//! The core can be exercised without any Tokio, channels or tasks.

use crate::chain::{ChainHandle, ChainSnapshot, ChainTable, PruneReport, TaskStatus, TaskId};
use crate::constraints::ConstraintSnapshot;
use crate::engine::event_handlers::{
    CoreStep, handle_cancel, handle_constraints_changed, handle_prune, handle_shutdown,
    handle_submission, handle_task_completion, handle_wake,
};
use crate::engine::{CoreEvent, RuntimeOptions, Submission};
use crate::errors::Result;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    table: ChainTable,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions, constraints: ConstraintSnapshot) -> Self {
        Self {
            table: ChainTable::new(options.retry, constraints),
        }
    }

    /// Returns `true` if no chain has unfinished tasks.
    pub fn is_idle(&self) -> bool {
        self.table.is_idle()
    }

    pub fn status_of(&self, id: TaskId) -> TaskStatus {
        self.table.status_of(id)
    }

    pub fn snapshot(&self, chain: &str) -> Option<ChainSnapshot> {
        self.table.snapshot(chain)
    }

    /// Resolve a submission against the chain table.
    pub fn submit(&mut self, submission: Submission) -> Result<(ChainHandle, CoreStep)> {
        handle_submission(&mut self.table, submission)
    }

    /// Drop every finished chain.
    pub fn prune(&mut self) -> (PruneReport, CoreStep) {
        handle_prune(&mut self.table)
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: CoreEvent) -> CoreStep {
        match event {
            CoreEvent::TaskCompleted {
                task,
                ticket,
                result,
            } => handle_task_completion(&mut self.table, task, ticket, result),
            CoreEvent::WakeDue { task, ticket } => handle_wake(&mut self.table, task, ticket),
            CoreEvent::ConstraintsChanged(snapshot) => {
                handle_constraints_changed(&mut self.table, snapshot)
            }
            CoreEvent::CancelChain { chain } => handle_cancel(&mut self.table, &chain),
            CoreEvent::ShutdownRequested => handle_shutdown(&self.table),
        }
    }
}
