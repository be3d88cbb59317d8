// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::chain::{Chain, Constraint, Data, RetryPolicy, TaskKind, TaskSpec};
use crate::chain::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES};
use crate::types::{BackoffPolicy, ExistingChainPolicy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// base_delay_ms = 30000
/// max_retries = 3
///
/// [chain.pipeline]
/// policy = "keep"
///
/// [[chain.pipeline.task]]
/// kind = "download"
/// constraints = ["network_connected"]
/// input = { source = "https://example.com/image.raw" }
///
/// [[chain.pipeline.task]]
/// kind = "blur"
/// input = { radius = 5 }
/// ```
///
/// All sections except `[chain.<name>]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub artifacts: ArtifactsSection,

    #[serde(default)]
    pub network: NetworkSection,

    #[serde(default)]
    pub constraints: ConstraintsSection,

    /// All chains from `[chain.<name>]`, keyed by chain name.
    #[serde(default)]
    pub chain: BTreeMap<String, ChainConfig>,
}

/// Validated configuration. Built from a [`RawConfigFile`] via `TryFrom`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub artifacts: ArtifactsSection,
    pub network: NetworkSection,
    pub constraints: ConstraintsSection,
    pub chain: BTreeMap<String, ChainConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            scheduler: raw.scheduler,
            artifacts: raw.artifacts,
            network: raw.network,
            constraints: raw.constraints,
            chain: raw.chain,
        }
    }
}

/// `[scheduler]` section: retry backoff.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    #[serde(default)]
    pub backoff: BackoffPolicy,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_max_retries", alias = "max_attempts")]
    pub max_retries: u32,
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY.as_millis() as u64
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl SchedulerSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(self.base_delay_ms), self.max_retries)
            .with_backoff(self.backoff)
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// `[artifacts]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsSection {
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".workchain/artifacts")
}

impl Default for ArtifactsSection {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
        }
    }
}

/// `[network]` section. Without a `probe` address the network is assumed
/// to be connected.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSection {
    #[serde(default)]
    pub probe: Option<String>,

    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            probe: None,
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// `[constraints]` section: custom constraint tags satisfied at startup.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConstraintsSection {
    #[serde(default)]
    pub satisfied: Vec<Constraint>,
}

/// `[chain.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub policy: ExistingChainPolicy,

    /// `[[chain.<name>.task]]` entries, in execution order.
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

impl ChainConfig {
    /// Build a chain with freshly allocated task ids.
    pub fn to_chain(&self) -> Chain {
        Chain::from_tasks(self.tasks.iter().map(TaskConfig::to_spec).collect())
    }
}

/// `[[chain.<name>.task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub kind: TaskKind,

    #[serde(default)]
    pub constraints: Vec<Constraint>,

    /// Delay before the task first runs once it becomes the chain head.
    #[serde(default)]
    pub initial_delay_ms: u64,

    #[serde(default)]
    pub input: Data,
}

impl TaskConfig {
    pub fn to_spec(&self) -> TaskSpec {
        let mut builder = TaskSpec::builder(self.kind).input_data(self.input.clone());
        for constraint in self.constraints.iter() {
            builder = builder.constraint(constraint.clone());
        }
        if self.initial_delay_ms > 0 {
            builder = builder.initial_delay(Duration::from_millis(self.initial_delay_ms));
        }
        builder.build()
    }
}
