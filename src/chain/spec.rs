// src/chain/spec.rs

//! Immutable task descriptions and the chains built from them.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;

use crate::chain::data::{Data, Value};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque task identity, assigned when a [`TaskSpec`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag selecting which task body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Fetch bytes from a source and store them as an artifact.
    Download,
    /// Blur a stored artifact and store the result.
    Blur,
    /// Apply a colour filter to a stored artifact and store the result.
    ColorFilter,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Download => "download",
            TaskKind::Blur => "blur",
            TaskKind::ColorFilter => "color_filter",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "download" => Ok(TaskKind::Download),
            "blur" => Ok(TaskKind::Blur),
            "color_filter" | "colorfilter" => Ok(TaskKind::ColorFilter),
            other => Err(format!(
                "invalid task kind: {other} (expected \"download\", \"blur\" or \"color_filter\")"
            )),
        }
    }
}

/// Precondition gating a task's move from BLOCKED to RUNNING.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Constraint {
    /// Some network connection is available.
    NetworkConnected,
    /// Any other condition, identified by tag and driven through the
    /// constraint monitor.
    Custom(String),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::NetworkConnected => f.write_str("network_connected"),
            Constraint::Custom(tag) => f.write_str(tag),
        }
    }
}

impl FromStr for Constraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() {
            return Err("constraint tag must not be empty".to_string());
        }
        match tag.to_lowercase().as_str() {
            "network_connected" | "network" => Ok(Constraint::NetworkConnected),
            _ => Ok(Constraint::Custom(tag.to_string())),
        }
    }
}

impl TryFrom<String> for Constraint {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Immutable description of one unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpec {
    id: TaskId,
    kind: TaskKind,
    constraints: Vec<Constraint>,
    input: Data,
    initial_delay: Option<Duration>,
}

impl TaskSpec {
    pub fn builder(kind: TaskKind) -> TaskSpecBuilder {
        TaskSpecBuilder::new(kind)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn input(&self) -> &Data {
        &self.input
    }

    /// Delay applied the first time this task becomes runnable.
    pub fn initial_delay(&self) -> Option<Duration> {
        self.initial_delay
    }
}

/// Builder for [`TaskSpec`]. The id is allocated by [`TaskSpecBuilder::build`].
#[derive(Debug, Clone)]
pub struct TaskSpecBuilder {
    kind: TaskKind,
    constraints: Vec<Constraint>,
    input: Data,
    initial_delay: Option<Duration>,
}

impl TaskSpecBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            constraints: Vec::new(),
            input: Data::new(),
            initial_delay: None,
        }
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(key, value);
        self
    }

    pub fn input_data(mut self, data: Data) -> Self {
        self.input = data;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    pub fn build(self) -> TaskSpec {
        TaskSpec {
            id: TaskId::next(),
            kind: self.kind,
            constraints: self.constraints,
            input: self.input,
            initial_delay: self.initial_delay,
        }
    }
}

/// Ordered sequence of tasks run with strict succession.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chain {
    tasks: Vec<TaskSpec>,
}

impl Chain {
    pub fn new(first: TaskSpec) -> Self {
        Self { tasks: vec![first] }
    }

    /// Build from an arbitrary list. An empty list is rejected at submission.
    pub fn from_tasks(tasks: Vec<TaskSpec>) -> Self {
        Self { tasks }
    }

    pub fn then(mut self, next: TaskSpec) -> Self {
        self.tasks.push(next);
        self
    }

    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(TaskSpec::id).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn into_tasks(self) -> Vec<TaskSpec> {
        self.tasks
    }
}
