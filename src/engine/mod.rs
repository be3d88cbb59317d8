// src/engine/mod.rs

//! Scheduling engine for workchain.
//!
//! This module ties together:
//! - the chain table (uniqueness policy, succession, retries)
//! - the status board and observer feeds
//! - the main runtime event loop that reacts to:
//!   - submissions, cancellations and observer subscriptions
//!   - task completions from the executor
//!   - backoff / initial-delay timers
//!   - constraint changes
//!   - shutdown requests
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. Callers talk to the runtime through the
//! [`SchedulerHandle`] in [`handle`].

use tokio::sync::{mpsc, oneshot};

use crate::chain::{Chain, ChainHandle, ChainUpdate, PruneReport, RetryPolicy, TaskId, TaskResult};
use crate::constraints::ConstraintSnapshot;
use crate::errors::Result;
use crate::types::ExistingChainPolicy;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub retry: RetryPolicy,
}

/// A chain submitted under a name, with its uniqueness policy.
#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub policy: ExistingChainPolicy,
    pub chain: Chain,
}

/// Events the pure core reacts to.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// An attempt finished with a concrete result.
    TaskCompleted {
        task: TaskId,
        ticket: u64,
        result: TaskResult,
    },
    /// An initial-delay or backoff timer elapsed.
    WakeDue { task: TaskId, ticket: u64 },
    /// The set of satisfied constraints changed.
    ConstraintsChanged(ConstraintSnapshot),
    /// Cancel every unfinished task of the named chain.
    CancelChain { chain: String },
    /// Graceful shutdown requested.
    ShutdownRequested,
}

/// Events flowing into the runtime from handles, the executor and timers.
#[derive(Debug)]
pub enum RuntimeEvent {
    Submit {
        submission: Submission,
        reply: oneshot::Sender<Result<ChainHandle>>,
    },
    Observe {
        chain: String,
        feed: mpsc::UnboundedSender<ChainUpdate>,
    },
    Prune {
        reply: oneshot::Sender<PruneReport>,
    },
    Core(CoreEvent),
}

impl From<CoreEvent> for RuntimeEvent {
    fn from(event: CoreEvent) -> Self {
        RuntimeEvent::Core(event)
    }
}

pub mod board;
pub mod core;
pub mod event_handlers;
pub mod handle;
pub mod observers;
pub mod runtime;

pub use board::StatusBoard;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use handle::{
    ChainObserver, SchedulerHandle, UniqueChainRequest, spawn_scheduler, spawn_with_executor,
};
pub use observers::ObserverRegistry;
pub use runtime::Runtime;
