// src/chain/record.rs

//! Runtime-owned aggregate for the chain bound to one name.

use crate::chain::data::Data;
use crate::chain::spec::{Chain, TaskId, TaskSpec};
use crate::chain::status::{ChainSnapshot, TaskInfo, TaskStatus};

/// Mutable per-task state kept alongside the immutable spec.
#[derive(Debug, Clone)]
pub(crate) struct TaskEntry {
    pub spec: TaskSpec,
    /// Index of the submitted chain this task came from (APPEND adds segments).
    pub segment: usize,
    pub status: TaskStatus,
    pub output: Option<Data>,
    pub error: Option<String>,
    pub retries: u32,
    /// Bumped on every dispatch, stop and timer; stale completions and
    /// wake-ups carry an older value.
    pub ticket: u64,
    /// Whether this task has been the chain head before (initial delay
    /// applies once).
    pub activated: bool,
    /// Waiting for an initial-delay or backoff timer.
    pub timer_pending: bool,
}

impl TaskEntry {
    fn new(spec: TaskSpec, segment: usize, status: TaskStatus) -> Self {
        Self {
            spec,
            segment,
            status,
            output: None,
            error: None,
            retries: 0,
            ticket: 0,
            activated: false,
            timer_pending: false,
        }
    }

    pub fn id(&self) -> TaskId {
        self.spec.id()
    }

    fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.spec.id(),
            kind: self.spec.kind(),
            status: self.status,
            output: self.output.clone(),
            error: self.error.clone(),
            retries: self.retries,
        }
    }
}

/// All tasks currently bound to a chain name, in execution order.
///
/// Tasks run strictly one at a time: the head is the first task that has not
/// reached a terminal state, and every task before it is terminal.
#[derive(Debug, Clone)]
pub struct ChainRecord {
    name: String,
    id: u64,
    pub(crate) entries: Vec<TaskEntry>,
    segments: usize,
}

impl ChainRecord {
    /// First task ENQUEUED, the rest BLOCKED.
    pub fn new(name: impl Into<String>, id: u64, chain: Chain) -> Self {
        let entries = chain
            .into_tasks()
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let status = if i == 0 {
                    TaskStatus::Enqueued
                } else {
                    TaskStatus::Blocked
                };
                TaskEntry::new(spec, 0, status)
            })
            .collect();

        Self {
            name: name.into(),
            id,
            entries,
            segments: 1,
        }
    }

    /// Queue another chain behind the existing tasks; all of it starts BLOCKED.
    pub fn append(&mut self, chain: Chain) {
        let segment = self.segments;
        self.segments += 1;
        self.entries.extend(
            chain
                .into_tasks()
                .into_iter()
                .map(|spec| TaskEntry::new(spec, segment, TaskStatus::Blocked)),
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.entries.iter().all(|e| e.status.is_terminal())
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.entries.iter().map(TaskEntry::id).collect()
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    pub fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.position(id).map(|i| self.entries[i].status)
    }

    /// Index of the first non-terminal task.
    pub(crate) fn head(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.status.is_terminal())
    }

    /// One past the last index of the segment containing `idx`.
    pub(crate) fn segment_end(&self, idx: usize) -> usize {
        let segment = self.entries[idx].segment;
        self.entries[idx..]
            .iter()
            .position(|e| e.segment != segment)
            .map_or(self.entries.len(), |offset| idx + offset)
    }

    /// Declared input of task `idx` merged with the output of the task before
    /// it, if that task succeeded.
    pub(crate) fn input_for(&self, idx: usize) -> Data {
        let declared = self.entries[idx].spec.input();
        let preceding = idx
            .checked_sub(1)
            .map(|prev| &self.entries[prev])
            .filter(|prev| prev.status == TaskStatus::Succeeded)
            .and_then(|prev| prev.output.as_ref());

        match preceding {
            Some(output) => declared.merged_with(output),
            None => declared.clone(),
        }
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.name.clone(),
            record: self.id,
            tasks: self.entries.iter().map(TaskEntry::info).collect(),
            terminal: self.is_terminal(),
        }
    }
}
