// src/constraints.rs

//! Constraint state and change notification.
//!
//! - [`ConstraintSnapshot`] is the plain set of satisfied constraints the
//!   chain table evaluates against.
//! - [`ConstraintMonitor`] is the shared, cloneable source of truth. It wraps a
//!   `tokio::sync::watch` channel so the runtime can react to every change.
//! - [`spawn_network_probe`] keeps `network_connected` up to date by
//!   periodically opening a TCP connection.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chain::Constraint;

/// Set of constraints currently satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSnapshot {
    satisfied: BTreeSet<Constraint>,
}

impl ConstraintSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_satisfied(&self, constraint: &Constraint) -> bool {
        self.satisfied.contains(constraint)
    }

    pub fn all_satisfied(&self, constraints: &[Constraint]) -> bool {
        constraints.iter().all(|c| self.is_satisfied(c))
    }

    /// Returns `true` if the value changed.
    pub fn set(&mut self, constraint: Constraint, satisfied: bool) -> bool {
        if satisfied {
            self.satisfied.insert(constraint)
        } else {
            self.satisfied.remove(&constraint)
        }
    }

    pub fn satisfied(&self) -> impl Iterator<Item = &Constraint> {
        self.satisfied.iter()
    }
}

impl FromIterator<Constraint> for ConstraintSnapshot {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            satisfied: iter.into_iter().collect(),
        }
    }
}

/// Shared constraint state with change subscription.
#[derive(Debug, Clone)]
pub struct ConstraintMonitor {
    tx: Arc<watch::Sender<ConstraintSnapshot>>,
}

impl Default for ConstraintMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintMonitor {
    /// A monitor where nothing is satisfied yet.
    pub fn new() -> Self {
        Self::with_satisfied(std::iter::empty())
    }

    pub fn with_satisfied(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        let (tx, _rx) = watch::channel(constraints.into_iter().collect());
        Self { tx: Arc::new(tx) }
    }

    pub fn is_satisfied(&self, constraint: &Constraint) -> bool {
        self.tx.borrow().is_satisfied(constraint)
    }

    /// Update one constraint. Subscribers are only notified on an actual change.
    ///
    /// Returns `true` if the value changed.
    pub fn set(&self, constraint: Constraint, satisfied: bool) -> bool {
        let label = constraint.to_string();
        let changed = self
            .tx
            .send_if_modified(|snapshot| snapshot.set(constraint, satisfied));
        if changed {
            debug!(constraint = %label, satisfied, "constraint changed");
        }
        changed
    }

    pub fn snapshot(&self) -> ConstraintSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConstraintSnapshot> {
        self.tx.subscribe()
    }
}

/// Periodically probe `addr` over TCP and drive `network_connected`.
pub fn spawn_network_probe(
    monitor: ConstraintMonitor,
    addr: String,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(%addr, interval_ms = interval.as_millis() as u64, "network probe started");
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let connected = probe_once(&addr, timeout).await;
            if monitor.set(Constraint::NetworkConnected, connected) {
                info!(%addr, connected, "network connectivity changed");
            }
        }
    })
}

async fn probe_once(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            debug!(%addr, error = %e, "network probe failed");
            false
        }
        Err(_) => {
            debug!(%addr, "network probe timed out");
            false
        }
    }
}
