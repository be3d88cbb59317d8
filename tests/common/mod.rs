#![allow(dead_code)]

pub use workchain_test_utils::builders;
pub use workchain_test_utils::fake_collab;
pub use workchain_test_utils::fake_executor;
pub use workchain_test_utils::{fast_options, fast_retry, init_tracing, with_timeout};

use std::time::Duration;

use workchain::chain::{ChainUpdate, Constraint, TaskId, TaskKind, TaskSpec, TaskStatus};
use workchain::engine::SchedulerHandle;

pub fn spec(kind: TaskKind) -> TaskSpec {
    TaskSpec::builder(kind).build()
}

pub fn networked(kind: TaskKind) -> TaskSpec {
    TaskSpec::builder(kind)
        .constraint(Constraint::NetworkConnected)
        .build()
}

/// Poll the status board until `id` reaches `status` (5 s cap).
pub async fn wait_for_status(handle: &SchedulerHandle, id: TaskId, status: TaskStatus) {
    with_timeout(async {
        while handle.status(id) != status {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
}

/// Statuses a task went through, as seen in `updates` where it was the
/// changed task.
pub fn transitions_of(updates: &[ChainUpdate], id: TaskId) -> Vec<TaskStatus> {
    updates
        .iter()
        .filter(|u| u.changed == Some(id))
        .map(|u| u.snapshot.status_of(id))
        .collect()
}
