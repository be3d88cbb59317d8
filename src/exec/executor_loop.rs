// src/exec/executor_loop.rs

//! Main executor loop that manages running attempts.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chain::{ScheduledTask, TaskId};
use crate::collab::Collaborators;
use crate::engine::RuntimeEvent;
use crate::exec::context::StopToken;
use crate::exec::task_runner::run_task;

/// Instruction for the executor loop.
#[derive(Debug)]
pub enum ExecutorMessage {
    Run(Vec<ScheduledTask>),
    Stop(Vec<TaskId>),
}

/// Internal handle for a currently-running attempt.
struct ActiveTask {
    ticket: u64,
    stop: StopToken,
    handle: JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each attempt runs in its own Tokio task, so a slow body never delays
/// another chain. Per task id there is at most one live attempt: starting a
/// new attempt stops the previous one.
pub fn spawn_executor(
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
    collaborators: Collaborators,
) -> mpsc::Sender<ExecutorMessage> {
    let (tx, mut rx) = mpsc::channel::<ExecutorMessage>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskId, ActiveTask> = HashMap::new();

        while let Some(message) = rx.recv().await {
            active.retain(|_, task| !task.handle.is_finished());

            match message {
                ExecutorMessage::Run(tasks) => {
                    for task in tasks {
                        start_attempt(task, &mut active, &runtime_tx, &collaborators);
                    }
                }
                ExecutorMessage::Stop(ids) => {
                    for id in ids {
                        stop_attempt(id, &mut active);
                    }
                }
            }
        }

        info!("executor loop finished (channel closed)");
        for (_, task) in active.drain() {
            task.stop.stop();
        }
    });

    tx
}

fn start_attempt(
    task: ScheduledTask,
    active: &mut HashMap<TaskId, ActiveTask>,
    runtime_tx: &mpsc::UnboundedSender<RuntimeEvent>,
    collaborators: &Collaborators,
) {
    if let Some(previous) = active.remove(&task.id) {
        debug!(
            task = %task.id,
            previous_ticket = previous.ticket,
            ticket = task.ticket,
            "new attempt supersedes a live one; stopping it"
        );
        previous.stop.stop();
    }

    let stop = StopToken::new();
    let id = task.id;
    let ticket = task.ticket;
    let handle = tokio::spawn(run_task(
        task,
        collaborators.clone(),
        stop.clone(),
        runtime_tx.clone(),
    ));

    active.insert(
        id,
        ActiveTask {
            ticket,
            stop,
            handle,
        },
    );
}

fn stop_attempt(id: TaskId, active: &mut HashMap<TaskId, ActiveTask>) {
    match active.remove(&id) {
        Some(task) => {
            info!(task = %id, ticket = task.ticket, "stopping running attempt");
            task.stop.stop();
        }
        None => debug!(task = %id, "stop requested for an attempt that already finished"),
    }
}
