// src/errors.rs

//! Crate-wide error type and aliases.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkchainError {
    /// Malformed submission: blank chain name, empty chain, clashing task ids.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The scheduler runtime has exited and no longer accepts requests.
    #[error("scheduler runtime is not running")]
    SchedulerClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WorkchainError>;
