// src/exec/task_runner.rs

//! Individual attempt runner.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::chain::{ScheduledTask, TaskResult};
use crate::collab::Collaborators;
use crate::engine::{CoreEvent, RuntimeEvent};
use crate::exec::context::{StopToken, TaskContext};
use crate::exec::kinds;

/// Run one attempt and report its result to the runtime.
///
/// - The body runs as its own Tokio task; a panic becomes
///   `Failure("internal fault: ...")`.
/// - If the attempt was stopped while running, **no** `TaskCompleted` event
///   is sent for it.
pub async fn run_task(
    task: ScheduledTask,
    collaborators: Collaborators,
    stop: StopToken,
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
) {
    info!(
        chain = %task.chain,
        task = %task.id,
        kind = %task.kind,
        attempt = task.attempt,
        "starting task attempt"
    );

    let ctx = TaskContext::new(&task, collaborators, stop.clone());
    let kind = task.kind;
    let body = tokio::spawn(kinds::execute(kind, ctx));

    let result = match body.await {
        Ok(result) => result,
        Err(err) => {
            error!(task = %task.id, error = %err, "task body crashed");
            TaskResult::failure(format!("internal fault: {err}"))
        }
    };

    if stop.is_stopped() {
        debug!(
            task = %task.id,
            ticket = task.ticket,
            outcome = result.label(),
            "attempt was stopped; discarding its result"
        );
        return;
    }

    info!(
        chain = %task.chain,
        task = %task.id,
        outcome = result.label(),
        "task attempt finished"
    );

    let event = CoreEvent::TaskCompleted {
        task: task.id,
        ticket: task.ticket,
        result,
    };
    if runtime_tx.send(event.into()).is_err() {
        debug!(task = %task.id, "runtime gone; dropping task result");
    }
}
