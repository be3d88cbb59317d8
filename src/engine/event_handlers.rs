// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::chain::{
    ChainHandle, ChainStep, ChainTable, ChainUpdate, PruneReport, ScheduledTask, TaskId,
    TaskResult, WakeRequest,
};
use crate::constraints::ConstraintSnapshot;
use crate::engine::Submission;
use crate::errors::Result;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Record this update on the status board and push it to observers.
    Publish(ChainUpdate),
    /// Signal these running attempts to stop; their results will be ignored.
    StopTasks(Vec<TaskId>),
    /// Send these attempts to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Deliver `WakeDue` for the task once the delay has elapsed.
    WakeAfter(WakeRequest),
    /// Drop pruned chains and tasks from the status board.
    Forget(PruneReport),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Turn a chain-table step into shell commands.
///
/// Updates come first so observers see a task as RUNNING before any result
/// for it can arrive; stops precede dispatches so a restarted task never
/// overlaps its previous attempt.
pub fn step_to_commands(step: ChainStep) -> Vec<CoreCommand> {
    let ChainStep {
        updates,
        scheduled,
        stopped,
        wakes,
    } = step;

    let mut commands: Vec<CoreCommand> = updates.into_iter().map(CoreCommand::Publish).collect();
    if !stopped.is_empty() {
        commands.push(CoreCommand::StopTasks(stopped));
    }
    if !scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(scheduled));
    }
    commands.extend(wakes.into_iter().map(CoreCommand::WakeAfter));
    commands
}

fn running(step: ChainStep) -> CoreStep {
    CoreStep {
        commands: step_to_commands(step),
        keep_running: true,
    }
}

/// Handle a chain submission.
pub fn handle_submission(
    table: &mut ChainTable,
    submission: Submission,
) -> Result<(ChainHandle, CoreStep)> {
    let Submission {
        name,
        policy,
        chain,
    } = submission;
    let (handle, step) = table.submit(&name, policy, chain)?;
    Ok((handle, running(step)))
}

/// Handle the result of a task attempt.
pub fn handle_task_completion(
    table: &mut ChainTable,
    task: TaskId,
    ticket: u64,
    result: TaskResult,
) -> CoreStep {
    running(table.task_completed(task, ticket, result))
}

/// Handle an elapsed timer.
pub fn handle_wake(table: &mut ChainTable, task: TaskId, ticket: u64) -> CoreStep {
    running(table.wake_due(task, ticket))
}

/// Handle a constraint change.
pub fn handle_constraints_changed(
    table: &mut ChainTable,
    constraints: ConstraintSnapshot,
) -> CoreStep {
    running(table.constraints_changed(constraints))
}

/// Handle an explicit cancellation request.
pub fn handle_cancel(table: &mut ChainTable, chain: &str) -> CoreStep {
    running(table.cancel(chain))
}

/// Handle a prune request.
pub fn handle_prune(table: &mut ChainTable) -> (PruneReport, CoreStep) {
    let report = table.prune();
    let mut step = CoreStep::idle();
    if !report.chains.is_empty() || !report.tasks.is_empty() {
        step.commands.push(CoreCommand::Forget(report.clone()));
    }
    (report, step)
}

/// Handle shutdown: stop whatever is still running and leave the loop.
pub fn handle_shutdown(table: &ChainTable) -> CoreStep {
    let running = table.running_tasks();
    let mut commands = Vec::new();
    if !running.is_empty() {
        commands.push(CoreCommand::StopTasks(running));
    }
    CoreStep {
        commands,
        keep_running: false,
    }
}
