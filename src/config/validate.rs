// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WorkchainError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WorkchainError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_chains(cfg)?;
    validate_chains(cfg)?;
    validate_scheduler(cfg)?;
    validate_network(cfg)?;
    Ok(())
}

fn config_error(message: impl Into<String>) -> WorkchainError {
    WorkchainError::ConfigError(message.into())
}

fn ensure_has_chains(cfg: &RawConfigFile) -> Result<()> {
    if cfg.chain.is_empty() {
        return Err(config_error(
            "config must contain at least one [chain.<name>] section",
        ));
    }
    Ok(())
}

fn validate_chains(cfg: &RawConfigFile) -> Result<()> {
    for (name, chain) in cfg.chain.iter() {
        if name.trim().is_empty() {
            return Err(config_error("chain names must not be blank"));
        }
        if chain.tasks.is_empty() {
            return Err(config_error(format!(
                "chain '{name}' must contain at least one [[chain.{name}.task]] entry"
            )));
        }
    }
    Ok(())
}

fn validate_scheduler(cfg: &RawConfigFile) -> Result<()> {
    let s = &cfg.scheduler;
    if s.max_delay_ms < s.base_delay_ms {
        return Err(config_error(format!(
            "[scheduler].max_delay_ms ({}) must be >= base_delay_ms ({})",
            s.max_delay_ms, s.base_delay_ms
        )));
    }
    Ok(())
}

fn validate_network(cfg: &RawConfigFile) -> Result<()> {
    let n = &cfg.network;
    let Some(probe) = n.probe.as_deref() else {
        return Ok(());
    };
    if probe.trim().is_empty() {
        return Err(config_error("[network].probe must not be empty"));
    }
    if n.probe_interval_ms == 0 {
        return Err(config_error("[network].probe_interval_ms must be > 0"));
    }
    if n.probe_timeout_ms == 0 {
        return Err(config_error("[network].probe_timeout_ms must be > 0"));
    }
    Ok(())
}
