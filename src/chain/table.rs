// src/chain/table.rs

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::chain::record::ChainRecord;
use crate::chain::retry::RetryPolicy;
use crate::chain::spec::{Chain, TaskId};
use crate::chain::state_manager::StateManager;
use crate::chain::status::{ChainHandle, ChainSnapshot, SubmitOutcome, TaskStatus};
use crate::chain::step::{ChainStep, TaskResult};
use crate::constraints::ConstraintSnapshot;
use crate::errors::{Result, WorkchainError};
use crate::types::ExistingChainPolicy;

/// Chains and tasks dropped by [`ChainTable::prune`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub chains: Vec<String>,
    pub tasks: Vec<TaskId>,
}

/// The table of chain records, keyed by chain name.
///
/// It is responsible for:
/// - resolving a submission against the chain already bound to its name
///   (KEEP / REPLACE / APPEND)
/// - routing completions, wake-ups and constraint changes to the right record
/// - remembering which record owns which task id
///
/// It performs no IO; every operation returns a [`ChainStep`] describing
/// what the shell should do.
#[derive(Debug)]
pub struct ChainTable {
    records: HashMap<String, ChainRecord>,
    /// Task id -> owning chain name, for records still in the table.
    index: HashMap<TaskId, String>,
    /// Ids of superseded records, reported by the next prune.
    superseded: Vec<TaskId>,
    /// Monotonically increasing record id.
    record_counter: u64,
    constraints: ConstraintSnapshot,
    retry: RetryPolicy,
}

impl ChainTable {
    pub fn new(retry: RetryPolicy, constraints: ConstraintSnapshot) -> Self {
        Self {
            records: HashMap::new(),
            index: HashMap::new(),
            superseded: Vec::new(),
            record_counter: 0,
            constraints,
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn constraints(&self) -> &ConstraintSnapshot {
        &self.constraints
    }

    /// Whether the chain bound to `name` still has unfinished tasks.
    pub fn is_active(&self, name: &str) -> bool {
        self.records.get(name).is_some_and(|r| !r.is_terminal())
    }

    /// Returns `true` if no record has unfinished tasks.
    pub fn is_idle(&self) -> bool {
        self.records.values().all(ChainRecord::is_terminal)
    }

    pub fn status_of(&self, id: TaskId) -> TaskStatus {
        self.index
            .get(&id)
            .and_then(|name| self.records.get(name))
            .and_then(|record| record.status_of(id))
            .unwrap_or(TaskStatus::Unknown)
    }

    pub fn snapshot(&self, name: &str) -> Option<ChainSnapshot> {
        self.records.get(name).map(ChainRecord::snapshot)
    }

    pub fn chain_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Ids of every task currently RUNNING, across all records.
    pub fn running_tasks(&self) -> Vec<TaskId> {
        let mut running: Vec<TaskId> = self
            .records
            .values()
            .flat_map(|record| record.entries.iter())
            .filter(|entry| entry.status == TaskStatus::Running)
            .map(|entry| entry.id())
            .collect();
        running.sort();
        running
    }

    /// Submit `chain` under `name`.
    pub fn submit(
        &mut self,
        name: &str,
        policy: ExistingChainPolicy,
        chain: Chain,
    ) -> Result<(ChainHandle, ChainStep)> {
        validate_submission(name, &chain)?;

        let mut step = ChainStep::default();

        if self.is_active(name) {
            match policy {
                ExistingChainPolicy::Keep => {
                    let record = &self.records[name];
                    info!(
                        chain = %name,
                        record = record.id(),
                        "active chain exists; keeping it and discarding the new one"
                    );
                    let handle = ChainHandle {
                        chain: name.to_string(),
                        record: record.id(),
                        task_ids: record.task_ids(),
                        outcome: SubmitOutcome::Kept,
                    };
                    return Ok((handle, step));
                }
                ExistingChainPolicy::Append => {
                    self.ensure_fresh_ids(&chain, None)?;
                    let task_ids = chain.task_ids();
                    for id in task_ids.iter() {
                        self.index.insert(*id, name.to_string());
                    }

                    let Some(record) = self.records.get_mut(name) else {
                        return Err(WorkchainError::InvalidArgument(format!(
                            "chain '{name}' disappeared while appending"
                        )));
                    };
                    record.append(chain);
                    info!(
                        chain = %name,
                        record = record.id(),
                        appended = task_ids.len(),
                        "appended chain behind the active one"
                    );

                    let mut manager =
                        StateManager::new(record, &self.constraints, &self.retry, &mut step);
                    manager.publish(task_ids.first().copied());

                    let handle = ChainHandle {
                        chain: name.to_string(),
                        record: record.id(),
                        task_ids,
                        outcome: SubmitOutcome::Appended,
                    };
                    return Ok((handle, step));
                }
                ExistingChainPolicy::Replace => {
                    self.ensure_fresh_ids(&chain, Some(name))?;
                    if let Some(record) = self.records.get_mut(name) {
                        info!(
                            chain = %name,
                            record = record.id(),
                            "replacing active chain; cancelling unfinished tasks"
                        );
                        let mut manager =
                            StateManager::new(record, &self.constraints, &self.retry, &mut step);
                        manager.cancel_all();
                    }
                    let handle = self.start_record(name, chain, SubmitOutcome::Replaced, &mut step);
                    return Ok((handle, step));
                }
            }
        }

        self.ensure_fresh_ids(&chain, None)?;
        let handle = self.start_record(name, chain, SubmitOutcome::Started, &mut step);
        Ok((handle, step))
    }

    /// Create a new record for `name`, superseding any previous one, and start
    /// its head task.
    fn start_record(
        &mut self,
        name: &str,
        chain: Chain,
        outcome: SubmitOutcome,
        step: &mut ChainStep,
    ) -> ChainHandle {
        if let Some(old) = self.records.remove(name) {
            for id in old.task_ids() {
                if self.index.get(&id).is_some_and(|owner| owner == name) {
                    self.index.remove(&id);
                    self.superseded.push(id);
                }
            }
            debug!(chain = %name, record = old.id(), "superseded previous chain record");
        }

        self.record_counter += 1;
        let record_id = self.record_counter;
        let task_ids = chain.task_ids();
        for id in task_ids.iter() {
            self.index.insert(*id, name.to_string());
        }

        info!(
            chain = %name,
            record = record_id,
            tasks = task_ids.len(),
            "starting chain"
        );

        let record = self
            .records
            .entry(name.to_string())
            .or_insert(ChainRecord::new(name, record_id, chain));

        let mut manager = StateManager::new(record, &self.constraints, &self.retry, step);
        manager.publish(task_ids.first().copied());
        manager.advance();

        ChainHandle {
            chain: name.to_string(),
            record: record_id,
            task_ids,
            outcome,
        }
    }

    /// Reject ids that already belong to an active record, other than the one
    /// about to be replaced.
    fn ensure_fresh_ids(&self, chain: &Chain, replacing: Option<&str>) -> Result<()> {
        for id in chain.task_ids() {
            let Some(owner) = self.index.get(&id) else {
                continue;
            };
            if Some(owner.as_str()) == replacing {
                continue;
            }
            if self.is_active(owner) {
                return Err(WorkchainError::InvalidArgument(format!(
                    "task {id} is already scheduled in active chain '{owner}'"
                )));
            }
        }
        Ok(())
    }

    /// Apply the result of a task attempt.
    pub fn task_completed(&mut self, id: TaskId, ticket: u64, result: TaskResult) -> ChainStep {
        let mut step = ChainStep::default();
        let Some(record) = record_for(&mut self.records, &self.index, id) else {
            debug!(task = %id, "completion for unknown task; ignoring");
            return step;
        };

        let mut manager = StateManager::new(record, &self.constraints, &self.retry, &mut step);
        manager.complete(id, ticket, result);
        step
    }

    /// A timer armed for `id` fired.
    pub fn wake_due(&mut self, id: TaskId, ticket: u64) -> ChainStep {
        let mut step = ChainStep::default();
        let Some(record) = record_for(&mut self.records, &self.index, id) else {
            return step;
        };

        let mut manager = StateManager::new(record, &self.constraints, &self.retry, &mut step);
        manager.wake(id, ticket);
        step
    }

    /// Replace the constraint snapshot and re-evaluate every active record.
    pub fn constraints_changed(&mut self, constraints: ConstraintSnapshot) -> ChainStep {
        let mut step = ChainStep::default();
        if constraints == self.constraints {
            return step;
        }
        self.constraints = constraints;

        let mut names: Vec<&String> = self.records.keys().collect();
        names.sort();
        let names: Vec<String> = names.into_iter().cloned().collect();

        for name in names {
            if let Some(record) = self.records.get_mut(&name) {
                if record.is_terminal() {
                    continue;
                }
                let mut manager =
                    StateManager::new(record, &self.constraints, &self.retry, &mut step);
                manager.constraints_changed();
            }
        }
        step
    }

    /// Cancel every unfinished task of the chain bound to `name`.
    pub fn cancel(&mut self, name: &str) -> ChainStep {
        let mut step = ChainStep::default();
        match self.records.get_mut(name) {
            Some(record) if !record.is_terminal() => {
                info!(chain = %name, record = record.id(), "cancelling chain");
                let mut manager =
                    StateManager::new(record, &self.constraints, &self.retry, &mut step);
                manager.cancel_all();
            }
            Some(_) => debug!(chain = %name, "cancel requested for finished chain; nothing to do"),
            None => warn!(chain = %name, "cancel requested for unknown chain"),
        }
        step
    }

    /// Drop every terminal record, and forget the ids of records that were
    /// superseded since the last prune.
    pub fn prune(&mut self) -> PruneReport {
        let finished: Vec<String> = self
            .records
            .iter()
            .filter(|(_, r)| r.is_terminal())
            .map(|(name, _)| name.clone())
            .collect();

        let mut report = PruneReport::default();
        // A superseded id may have been submitted again since.
        let superseded = std::mem::take(&mut self.superseded);
        report.tasks.extend(
            superseded
                .into_iter()
                .filter(|id| !self.index.contains_key(id)),
        );

        for name in finished {
            if let Some(record) = self.records.remove(&name) {
                for id in record.task_ids() {
                    if self.index.get(&id).is_some_and(|owner| *owner == name) {
                        self.index.remove(&id);
                        report.tasks.push(id);
                    }
                }
                report.chains.push(name);
            }
        }

        if !report.chains.is_empty() || !report.tasks.is_empty() {
            info!(
                chains = ?report.chains,
                tasks = report.tasks.len(),
                "pruned finished chains"
            );
        }
        report
    }
}

fn record_for<'a>(
    records: &'a mut HashMap<String, ChainRecord>,
    index: &HashMap<TaskId, String>,
    id: TaskId,
) -> Option<&'a mut ChainRecord> {
    let name = index.get(&id)?;
    records.get_mut(name)
}

/// Reject blank names, empty chains and chains listing the same task twice.
pub fn validate_submission(name: &str, chain: &Chain) -> Result<()> {
    if name.trim().is_empty() {
        return Err(WorkchainError::InvalidArgument(
            "chain name must not be empty".to_string(),
        ));
    }

    if chain.is_empty() {
        return Err(WorkchainError::InvalidArgument(format!(
            "chain '{name}' must contain at least one task"
        )));
    }

    let mut seen = HashSet::new();
    for id in chain.task_ids() {
        if !seen.insert(id) {
            return Err(WorkchainError::InvalidArgument(format!(
                "task {id} appears more than once in chain '{name}'"
            )));
        }
    }

    Ok(())
}
