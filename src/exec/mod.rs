// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running task bodies and
//! reporting back to the runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the loop that starts and stops attempts.
//! - [`task_runner`] runs a single attempt and reports its result.
//! - [`kinds`] holds the built-in task bodies; [`keys`] the data keys they
//!   exchange.
//! - [`context`] provides `TaskContext` and the `StopToken`.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `TokioExecutorBackend` used in production, which tests can replace with
//!   a fake implementation.

pub mod backend;
pub mod context;
pub mod executor_loop;
pub mod keys;
pub mod kinds;
pub mod task_runner;

pub use backend::{ExecutorBackend, TokioExecutorBackend};
pub use context::{StopToken, TaskContext};
pub use executor_loop::spawn_executor;
