// src/engine/handle.rs

//! Public surface of a running scheduler.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::chain::{
    Chain, ChainHandle, ChainSnapshot, ChainUpdate, PruneReport, TaskId, TaskInfo, TaskSpec,
    TaskStatus, validate_submission,
};
use crate::collab::Collaborators;
use crate::constraints::ConstraintMonitor;
use crate::engine::board::StatusBoard;
use crate::engine::core::CoreRuntime;
use crate::engine::runtime::Runtime;
use crate::engine::{CoreEvent, RuntimeEvent, RuntimeOptions, Submission};
use crate::errors::{Result, WorkchainError};
use crate::exec::{ExecutorBackend, TokioExecutorBackend};
use crate::types::ExistingChainPolicy;

/// Cloneable handle for submitting, observing and cancelling chains.
///
/// Status lookups read a shared board and never wait on the runtime loop.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<RuntimeEvent>,
    board: StatusBoard,
}

impl SchedulerHandle {
    fn send(&self, event: RuntimeEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| WorkchainError::SchedulerClosed)
    }

    /// Submit `chain` under `name`.
    ///
    /// Malformed submissions are rejected before anything reaches the
    /// runtime.
    pub async fn submit(
        &self,
        name: impl Into<String>,
        policy: ExistingChainPolicy,
        chain: Chain,
    ) -> Result<ChainHandle> {
        let name = name.into();
        validate_submission(&name, &chain)?;

        let (reply, rx) = oneshot::channel();
        self.send(RuntimeEvent::Submit {
            submission: Submission {
                name,
                policy,
                chain,
            },
            reply,
        })?;
        rx.await.map_err(|_| WorkchainError::SchedulerClosed)?
    }

    /// Start building a chain to submit under `name`.
    pub fn begin_unique(
        &self,
        name: impl Into<String>,
        policy: ExistingChainPolicy,
        first: TaskSpec,
    ) -> UniqueChainRequest {
        UniqueChainRequest {
            handle: self.clone(),
            name: name.into(),
            policy,
            chain: Chain::new(first),
        }
    }

    pub fn status(&self, id: TaskId) -> TaskStatus {
        self.board.status(id)
    }

    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo> {
        self.board.task_info(id)
    }

    pub fn chain_snapshot(&self, chain: &str) -> Option<ChainSnapshot> {
        self.board.chain_snapshot(chain)
    }

    /// Subscribe to the updates of the chain bound to `chain`.
    pub fn observe(&self, chain: impl Into<String>) -> Result<ChainObserver> {
        let chain = chain.into();
        let (feed, rx) = mpsc::unbounded_channel();
        self.send(RuntimeEvent::Observe {
            chain: chain.clone(),
            feed,
        })?;
        Ok(ChainObserver { chain, rx })
    }

    /// Cancel every unfinished task of the chain bound to `chain`.
    pub fn cancel_chain(&self, chain: impl Into<String>) -> Result<()> {
        self.send(CoreEvent::CancelChain {
            chain: chain.into(),
        }
        .into())
    }

    /// Drop every finished chain from the scheduler and the status board.
    pub async fn prune(&self) -> Result<PruneReport> {
        let (reply, rx) = oneshot::channel();
        self.send(RuntimeEvent::Prune { reply })?;
        rx.await.map_err(|_| WorkchainError::SchedulerClosed)
    }

    /// Ask the runtime to stop running attempts and exit its loop.
    pub fn shutdown(&self) -> Result<()> {
        self.send(CoreEvent::ShutdownRequested.into())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Fluent chain submission: `begin_unique(..).then(..).enqueue()`.
#[derive(Debug)]
pub struct UniqueChainRequest {
    handle: SchedulerHandle,
    name: String,
    policy: ExistingChainPolicy,
    chain: Chain,
}

impl UniqueChainRequest {
    pub fn then(mut self, next: TaskSpec) -> Self {
        self.chain = self.chain.then(next);
        self
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub async fn enqueue(self) -> Result<ChainHandle> {
        self.handle.submit(self.name, self.policy, self.chain).await
    }
}

/// Receiving end of an observer subscription.
///
/// The first item is the current snapshot (if the chain exists); the feed
/// ends after the terminal update.
#[derive(Debug)]
pub struct ChainObserver {
    chain: String,
    rx: mpsc::UnboundedReceiver<ChainUpdate>,
}

impl ChainObserver {
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Next update, or `None` once the feed has completed.
    pub async fn next(&mut self) -> Option<ChainUpdate> {
        self.rx.recv().await
    }

    /// Drain the feed until it completes.
    pub async fn collect(mut self) -> Vec<ChainUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.rx.recv().await {
            updates.push(update);
        }
        updates
    }

    /// Wait for the terminal snapshot. `None` if the feed ended without one
    /// (for example because the runtime shut down).
    pub async fn wait_terminal(mut self) -> Option<ChainSnapshot> {
        while let Some(update) = self.rx.recv().await {
            if update.snapshot.terminal {
                return Some(update.snapshot);
            }
        }
        debug!(chain = %self.chain, "observer feed ended before the chain finished");
        None
    }
}

/// Spawn a scheduler that runs task bodies on Tokio with `collaborators`.
pub fn spawn_scheduler(
    options: RuntimeOptions,
    monitor: &ConstraintMonitor,
    collaborators: Collaborators,
) -> (SchedulerHandle, JoinHandle<Result<()>>) {
    spawn_with_executor(options, monitor, move |tx| {
        TokioExecutorBackend::new(tx, collaborators)
    })
}

/// Spawn a scheduler around an arbitrary executor backend.
///
/// `make_executor` receives the sender the executor reports completions on.
pub fn spawn_with_executor<E, F>(
    options: RuntimeOptions,
    monitor: &ConstraintMonitor,
    make_executor: F,
) -> (SchedulerHandle, JoinHandle<Result<()>>)
where
    E: ExecutorBackend + 'static,
    F: FnOnce(mpsc::UnboundedSender<RuntimeEvent>) -> E,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let board = StatusBoard::new();

    let core = CoreRuntime::new(options, monitor.snapshot());
    let executor = make_executor(tx.clone());
    let runtime = Runtime::new(
        core,
        rx,
        tx.clone(),
        monitor.subscribe(),
        executor,
        board.clone(),
    );
    let join = tokio::spawn(runtime.run());

    (SchedulerHandle { tx, board }, join)
}
