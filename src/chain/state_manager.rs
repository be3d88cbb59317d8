// src/chain/state_manager.rs

//! State transitions for the tasks of a single chain record.
//!
//! Every status change goes through [`StateManager::set_status`], which
//! appends an observer update to the step. This keeps the update order equal
//! to the order in which transitions were applied.

use tracing::{debug, info, warn};

use crate::chain::record::ChainRecord;
use crate::chain::retry::RetryPolicy;
use crate::chain::spec::TaskId;
use crate::chain::status::{ChainUpdate, TaskStatus};
use crate::chain::step::{ChainStep, ScheduledTask, TaskResult, WakeRequest};
use crate::constraints::ConstraintSnapshot;

pub struct StateManager<'a> {
    record: &'a mut ChainRecord,
    constraints: &'a ConstraintSnapshot,
    retry: &'a RetryPolicy,
    step: &'a mut ChainStep,
}

impl<'a> StateManager<'a> {
    pub fn new(
        record: &'a mut ChainRecord,
        constraints: &'a ConstraintSnapshot,
        retry: &'a RetryPolicy,
        step: &'a mut ChainStep,
    ) -> Self {
        Self {
            record,
            constraints,
            retry,
            step,
        }
    }

    /// Push a snapshot of the record without changing anything (used when a
    /// record is created or extended).
    pub fn publish(&mut self, changed: Option<TaskId>) {
        self.step.updates.push(ChainUpdate {
            changed,
            snapshot: self.record.snapshot(),
        });
    }

    fn set_status(&mut self, idx: usize, status: TaskStatus) {
        let entry = &self.record.entries[idx];
        if entry.status == status {
            return;
        }

        debug!(
            chain = %self.record.name(),
            task = %entry.id(),
            from = %entry.status,
            to = %status,
            "task transition"
        );
        let id = entry.id();
        self.record.entries[idx].status = status;
        self.publish(Some(id));
    }

    /// Start the head task if it is waiting and allowed to run.
    ///
    /// - First activation moves a BLOCKED task to ENQUEUED and arms the
    ///   initial delay, if any.
    /// - A task waiting on a timer stays ENQUEUED.
    /// - Met constraints move it to RUNNING and schedule an attempt, unmet
    ///   constraints leave it BLOCKED.
    pub fn advance(&mut self) {
        let Some(idx) = self.record.head() else {
            return;
        };

        match self.record.entries[idx].status {
            TaskStatus::Enqueued | TaskStatus::Blocked => {}
            _ => return,
        }

        if !self.record.entries[idx].activated {
            self.record.entries[idx].activated = true;
            self.set_status(idx, TaskStatus::Enqueued);

            let delay = self.record.entries[idx]
                .spec
                .initial_delay()
                .filter(|d| !d.is_zero());
            if let Some(delay) = delay {
                self.arm_timer(idx, delay);
                return;
            }
        }

        if self.record.entries[idx].timer_pending {
            return;
        }

        let constraints_met = self
            .constraints
            .all_satisfied(self.record.entries[idx].spec.constraints());

        if constraints_met {
            self.start(idx);
        } else {
            debug!(
                chain = %self.record.name(),
                task = %self.record.entries[idx].id(),
                "constraints unmet; task blocked"
            );
            self.set_status(idx, TaskStatus::Blocked);
        }
    }

    fn start(&mut self, idx: usize) {
        let input = self.record.input_for(idx);
        let chain = self.record.name().to_string();

        let entry = &mut self.record.entries[idx];
        entry.ticket += 1;
        let scheduled = ScheduledTask {
            id: entry.id(),
            chain,
            kind: entry.spec.kind(),
            input,
            ticket: entry.ticket,
            attempt: entry.retries + 1,
        };

        info!(
            chain = %scheduled.chain,
            task = %scheduled.id,
            kind = %scheduled.kind,
            attempt = scheduled.attempt,
            "scheduling task attempt"
        );

        self.set_status(idx, TaskStatus::Running);
        self.step.scheduled.push(scheduled);
    }

    fn arm_timer(&mut self, idx: usize, delay: std::time::Duration) {
        let entry = &mut self.record.entries[idx];
        entry.ticket += 1;
        entry.timer_pending = true;
        self.step.wakes.push(WakeRequest {
            task: entry.id(),
            ticket: entry.ticket,
            delay,
        });
    }

    /// Apply the result of a running attempt.
    ///
    /// Results for attempts that are no longer current (stopped, cancelled or
    /// superseded) are discarded.
    pub fn complete(&mut self, id: TaskId, ticket: u64, result: TaskResult) {
        let Some(idx) = self.record.position(id) else {
            warn!(task = %id, "completion for task outside this record; ignoring");
            return;
        };

        let entry = &self.record.entries[idx];
        if entry.status != TaskStatus::Running || entry.ticket != ticket {
            debug!(
                chain = %self.record.name(),
                task = %id,
                ticket,
                current_ticket = entry.ticket,
                status = %entry.status,
                "discarding stale task result"
            );
            return;
        }

        match result {
            TaskResult::Success(output) => {
                info!(chain = %self.record.name(), task = %id, "task succeeded");
                self.record.entries[idx].output = Some(output);
                self.set_status(idx, TaskStatus::Succeeded);
                self.advance();
            }
            TaskResult::Failure(message) => {
                self.fail(idx, message);
            }
            TaskResult::Retry => {
                let retries = self.record.entries[idx].retries;
                if retries >= self.retry.max_retries {
                    self.fail(
                        idx,
                        format!("max retries exceeded ({})", self.retry.max_retries),
                    );
                    return;
                }

                let retry = retries + 1;
                let delay = self.retry.delay_for(retry);
                info!(
                    chain = %self.record.name(),
                    task = %id,
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    "task requested retry"
                );
                self.record.entries[idx].retries = retry;
                self.arm_timer(idx, delay);
                self.set_status(idx, TaskStatus::Enqueued);
            }
        }
    }

    /// Mark `idx` FAILED and cancel the rest of its segment. A later
    /// (appended) segment still gets its turn.
    fn fail(&mut self, idx: usize, message: String) {
        warn!(
            chain = %self.record.name(),
            task = %self.record.entries[idx].id(),
            error = %message,
            "task failed; cancelling the rest of its chain"
        );
        self.record.entries[idx].error = Some(message);
        self.set_status(idx, TaskStatus::Failed);

        let end = self.record.segment_end(idx);
        for j in idx + 1..end {
            self.cancel_entry(j);
        }

        self.advance();
    }

    /// A backoff or initial-delay timer fired.
    pub fn wake(&mut self, id: TaskId, ticket: u64) {
        let Some(idx) = self.record.position(id) else {
            return;
        };

        let entry = &mut self.record.entries[idx];
        if !entry.timer_pending || entry.ticket != ticket {
            debug!(task = %id, ticket, "ignoring stale wake-up");
            return;
        }

        entry.timer_pending = false;
        self.advance();
    }

    /// Re-evaluate the head after the constraint snapshot changed.
    ///
    /// A RUNNING head whose constraints no longer hold is stopped and goes
    /// back to BLOCKED without counting a retry.
    pub fn constraints_changed(&mut self) {
        let Some(idx) = self.record.head() else {
            return;
        };

        let entry = &self.record.entries[idx];
        match entry.status {
            TaskStatus::Running => {
                if !self.constraints.all_satisfied(entry.spec.constraints()) {
                    info!(
                        chain = %self.record.name(),
                        task = %entry.id(),
                        "constraints lost while running; stopping attempt"
                    );
                    let entry = &mut self.record.entries[idx];
                    entry.ticket += 1;
                    let id = entry.id();
                    self.step.stopped.push(id);
                    self.set_status(idx, TaskStatus::Blocked);
                }
            }
            TaskStatus::Blocked | TaskStatus::Enqueued => self.advance(),
            _ => {}
        }
    }

    /// Cancel every non-terminal task of the record.
    pub fn cancel_all(&mut self) {
        for idx in 0..self.record.len() {
            self.cancel_entry(idx);
        }
    }

    fn cancel_entry(&mut self, idx: usize) {
        let entry = &mut self.record.entries[idx];
        if entry.status.is_terminal() {
            return;
        }

        if entry.status == TaskStatus::Running {
            self.step.stopped.push(entry.id());
        }
        entry.ticket += 1;
        entry.timer_pending = false;
        self.set_status(idx, TaskStatus::Cancelled);
    }
}
