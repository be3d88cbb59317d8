// src/chain/mod.rs

//! Task chains and their per-name runtime state.
//!
//! - [`data`] holds the opaque key/value payloads tasks exchange.
//! - [`spec`] defines immutable task descriptions and chains.
//! - [`status`] provides the read-only views handed to callers and observers.
//! - [`record`] keeps the mutable state of the chain bound to one name.
//! - [`state_manager`] applies task-state transitions to a record.
//! - [`table`] maps chain names to records and enforces the uniqueness policy.
//! - [`retry`] computes backoff delays.
//! - [`step`] defines what a table operation produced.

pub mod data;
pub mod record;
pub mod retry;
pub mod spec;
pub mod state_manager;
pub mod status;
pub mod step;
pub mod table;

pub use data::{Data, Value};
pub use record::ChainRecord;
pub use retry::RetryPolicy;
pub use spec::{Chain, Constraint, TaskId, TaskKind, TaskSpec, TaskSpecBuilder};
pub use status::{ChainHandle, ChainSnapshot, ChainUpdate, SubmitOutcome, TaskInfo, TaskStatus};
pub use step::{ChainStep, ScheduledTask, TaskResult, WakeRequest};
pub use table::{ChainTable, PruneReport, validate_submission};
