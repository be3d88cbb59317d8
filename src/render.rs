// src/render.rs

//! Human-readable status lines for the command-line front end.

use crate::chain::{ChainSnapshot, ChainUpdate, TaskInfo, TaskKind, TaskStatus};

/// One-line description of a task kind in a given state.
pub fn status_line(kind: TaskKind, status: TaskStatus) -> String {
    let (noun, running) = match kind {
        TaskKind::Download => ("Download", "Downloading..."),
        TaskKind::Blur => ("Blur", "Blurring..."),
        TaskKind::ColorFilter => ("Filter", "Applying Filter..."),
    };

    match status {
        TaskStatus::Running => running.to_string(),
        TaskStatus::Enqueued => format!("{noun} Enqueued"),
        TaskStatus::Blocked => format!("{noun} Blocked"),
        TaskStatus::Succeeded => format!("{noun} Succeeded"),
        TaskStatus::Failed => format!("{noun} Failed"),
        TaskStatus::Cancelled => format!("{noun} Cancelled"),
        TaskStatus::Unknown => format!("{noun} Unknown"),
    }
}

fn task_line(chain: &str, task: &TaskInfo) -> String {
    let mut line = format!("[{chain}] {} {}", task.id, status_line(task.kind, task.status));
    if let Some(error) = task.error.as_deref() {
        line.push_str(": ");
        line.push_str(error);
    }
    if task.retries > 0 && !task.status.is_terminal() {
        line.push_str(&format!(" (retry {})", task.retries));
    }
    line
}

/// Lines to print for one observer update.
///
/// A replayed snapshot prints every task; a live update prints the task
/// that changed.
pub fn update_lines(update: &ChainUpdate) -> Vec<String> {
    let chain = update.snapshot.chain.as_str();
    match update.changed_task() {
        Some(task) => vec![task_line(chain, task)],
        None if update.changed.is_none() => update
            .snapshot
            .tasks
            .iter()
            .map(|task| task_line(chain, task))
            .collect(),
        None => Vec::new(),
    }
}

/// Output values of every succeeded task, one line each.
pub fn output_lines(snapshot: &ChainSnapshot) -> Vec<String> {
    snapshot
        .tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Succeeded)
        .flat_map(|task| {
            task.output.iter().flat_map(move |output| {
                output
                    .iter()
                    .map(move |(key, value)| format!("[{}] {} {key} = {value}", snapshot.chain, task.id))
            })
        })
        .collect()
}
