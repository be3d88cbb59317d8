#![allow(dead_code)]

use std::collections::BTreeMap;

use workchain::chain::{Constraint, Data, TaskKind, Value};
use workchain::config::{
    ArtifactsSection, ChainConfig, ConfigFile, ConstraintsSection, NetworkSection, RawConfigFile,
    SchedulerSection, TaskConfig,
};
use workchain::types::ExistingChainPolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                scheduler: SchedulerSection::default(),
                artifacts: ArtifactsSection::default(),
                network: NetworkSection::default(),
                constraints: ConstraintsSection::default(),
                chain: BTreeMap::new(),
            },
        }
    }

    pub fn with_chain(mut self, name: &str, chain: ChainConfig) -> Self {
        self.config.chain.insert(name.to_string(), chain);
        self
    }

    pub fn with_retry(mut self, base_delay_ms: u64, max_retries: u32) -> Self {
        self.config.scheduler.base_delay_ms = base_delay_ms;
        self.config.scheduler.max_retries = max_retries;
        self
    }

    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.config.scheduler.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_probe(mut self, addr: &str) -> Self {
        self.config.network.probe = Some(addr.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ChainConfig`.
pub struct ChainConfigBuilder {
    chain: ChainConfig,
}

impl ChainConfigBuilder {
    pub fn new(policy: ExistingChainPolicy) -> Self {
        Self {
            chain: ChainConfig {
                policy,
                tasks: Vec::new(),
            },
        }
    }

    pub fn task(mut self, task: TaskConfig) -> Self {
        self.chain.tasks.push(task);
        self
    }

    pub fn build(self) -> ChainConfig {
        self.chain
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig {
                kind,
                constraints: Vec::new(),
                initial_delay_ms: 0,
                input: Data::new(),
            },
        }
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.task.constraints.push(constraint);
        self
    }

    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.task.initial_delay_ms = ms;
        self
    }

    pub fn input(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.task.input.insert(key, value);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
