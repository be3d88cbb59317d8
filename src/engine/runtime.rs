// src/engine/runtime.rs

use std::fmt;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::chain::ScheduledTask;
use crate::constraints::ConstraintSnapshot;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::board::StatusBoard;
use super::core::CoreRuntime;
use super::observers::ObserverRegistry;
use super::{CoreCommand, CoreEvent, CoreStep, RuntimeEvent};

/// Drives the chain table in response to `RuntimeEvent`s and constraint
/// changes, and delegates task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    /// Used by timers to deliver `WakeDue`.
    event_tx: mpsc::UnboundedSender<RuntimeEvent>,
    constraints_rx: watch::Receiver<ConstraintSnapshot>,
    executor: E,
    board: StatusBoard,
    observers: ObserverRegistry,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
        event_tx: mpsc::UnboundedSender<RuntimeEvent>,
        constraints_rx: watch::Receiver<ConstraintSnapshot>,
        executor: E,
        board: StatusBoard,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            constraints_rx,
            executor,
            board,
            observers: ObserverRegistry::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx` and constraint changes from
    ///   the monitor.
    /// - Feeds them into the core runtime.
    /// - Executes the commands returned by the core.
    pub async fn run(mut self) -> Result<()> {
        info!("workchain runtime started");

        // Constraints may have moved between the core snapshot and now.
        self.constraints_rx.mark_changed();
        let mut constraints_open = true;

        loop {
            let keep_running = tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        info!("runtime event channel closed; exiting");
                        false
                    }
                },
                changed = self.constraints_rx.changed(), if constraints_open => match changed {
                    Ok(()) => {
                        let snapshot = self.constraints_rx.borrow_and_update().clone();
                        debug!(?snapshot, "constraints changed");
                        let step = self.core.step(CoreEvent::ConstraintsChanged(snapshot));
                        self.apply(step).await?
                    }
                    Err(_) => {
                        debug!("constraint monitor dropped; constraints are frozen");
                        constraints_open = false;
                        true
                    }
                },
            };

            if !keep_running {
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn handle_event(&mut self, event: RuntimeEvent) -> Result<bool> {
        match event {
            RuntimeEvent::Submit { submission, reply } => {
                debug!(chain = %submission.name, policy = %submission.policy, "submission received");
                match self.core.submit(submission) {
                    Ok((handle, step)) => {
                        // Apply first so the board reflects the chain before the
                        // caller sees its handle.
                        let keep_running = self.apply(step).await?;
                        if reply.send(Ok(handle)).is_err() {
                            debug!("submitter went away before receiving its handle");
                        }
                        Ok(keep_running)
                    }
                    Err(err) => {
                        if reply.send(Err(err)).is_err() {
                            debug!("submitter went away before receiving its error");
                        }
                        Ok(true)
                    }
                }
            }
            RuntimeEvent::Observe { chain, feed } => {
                let current = self.core.snapshot(&chain);
                self.observers.subscribe(&chain, feed, current);
                Ok(true)
            }
            RuntimeEvent::Prune { reply } => {
                let (report, step) = self.core.prune();
                let keep_running = self.apply(step).await?;
                if reply.send(report).is_err() {
                    debug!("prune requester went away");
                }
                Ok(keep_running)
            }
            RuntimeEvent::Core(event) => {
                debug!(?event, "runtime received event");
                let step = self.core.step(event);
                self.apply(step).await
            }
        }
    }

    /// Execute a core step's commands and report whether to keep running.
    async fn apply(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            self.execute_command(command).await?;
        }
        if !step.keep_running {
            info!("core requested exit; stopping runtime");
        }
        Ok(step.keep_running)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Publish(update) => {
                self.board.record(&update.snapshot);
                self.observers.publish(&update);
            }
            CoreCommand::StopTasks(tasks) => {
                debug!(?tasks, "stopping running attempts");
                self.executor.stop_tasks(tasks).await?;
            }
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::WakeAfter(wake) => {
                let tx = self.event_tx.clone();
                debug!(task = %wake.task, ticket = wake.ticket, delay_ms = wake.delay.as_millis() as u64, "arming timer");
                tokio::spawn(async move {
                    tokio::time::sleep(wake.delay).await;
                    let event = CoreEvent::WakeDue {
                        task: wake.task,
                        ticket: wake.ticket,
                    };
                    if tx.send(event.into()).is_err() {
                        debug!(task = %wake.task, "runtime gone before timer fired");
                    }
                });
            }
            CoreCommand::Forget(report) => {
                self.board.forget(&report);
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
        debug!(?ids, "dispatching ready tasks");

        if let Err(err) = self.executor.spawn_ready_tasks(tasks).await {
            warn!(error = %err, "executor rejected dispatched tasks");
            return Err(err);
        }
        Ok(())
    }
}
