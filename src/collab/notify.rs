// src/collab/notify.rs

use tracing::info;

use crate::chain::TaskId;
use crate::collab::ForegroundNotifier;

/// Routes foreground notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ForegroundNotifier for LogNotifier {
    fn notify(&self, task: TaskId, message: &str) -> anyhow::Result<()> {
        info!(task = %task, "{message}");
        Ok(())
    }
}
