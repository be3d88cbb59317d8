// src/engine/board.rs

//! Read-only status index shared between the runtime and its handles.
//!
//! The runtime is the only writer; handles read it without going through the
//! event loop, so status lookups never block on scheduling work.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::chain::{ChainSnapshot, PruneReport, TaskId, TaskInfo, TaskStatus};

#[derive(Debug, Default)]
struct BoardState {
    tasks: HashMap<TaskId, TaskInfo>,
    chains: HashMap<String, ChainSnapshot>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<BoardState>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the latest snapshot of a chain and of each of its tasks.
    pub fn record(&self, snapshot: &ChainSnapshot) {
        let mut state = self.write();
        for task in snapshot.tasks.iter() {
            state.tasks.insert(task.id, task.clone());
        }
        state.chains.insert(snapshot.chain.clone(), snapshot.clone());
    }

    pub fn forget(&self, report: &PruneReport) {
        let mut state = self.write();
        for chain in report.chains.iter() {
            if let Some(snapshot) = state.chains.remove(chain) {
                for task in snapshot.tasks {
                    state.tasks.remove(&task.id);
                }
            }
        }
        for id in report.tasks.iter() {
            state.tasks.remove(id);
        }
    }

    /// `Unknown` for ids never submitted, or already pruned.
    pub fn status(&self, id: TaskId) -> TaskStatus {
        self.read()
            .tasks
            .get(&id)
            .map_or(TaskStatus::Unknown, |t| t.status)
    }

    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo> {
        self.read().tasks.get(&id).cloned()
    }

    pub fn chain_snapshot(&self, chain: &str) -> Option<ChainSnapshot> {
        self.read().chains.get(chain).cloned()
    }
}
