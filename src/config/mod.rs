// src/config/mod.rs

//! `Workchain.toml`: scheduler tuning, artifact location, constraint
//! sources and the chains the binary submits.
//!
//! Parsing yields a [`RawConfigFile`]; converting it into a [`ConfigFile`]
//! runs the checks in `validate.rs`, so a `ConfigFile` is always usable.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_with_fs};
pub use model::{
    ArtifactsSection, ChainConfig, ConfigFile, ConstraintsSection, NetworkSection, RawConfigFile,
    SchedulerSection, TaskConfig,
};
