// tests/chain_table.rs

mod common;
use crate::common::{networked, spec};

use std::time::Duration;

use workchain::chain::{
    Chain, ChainStep, ChainTable, Constraint, Data, RetryPolicy, SubmitOutcome, TaskKind,
    TaskResult, TaskSpec, TaskStatus,
};
use workchain::constraints::ConstraintSnapshot;
use workchain::errors::WorkchainError;
use workchain::types::{BackoffPolicy, ExistingChainPolicy};

fn table() -> ChainTable {
    ChainTable::new(
        RetryPolicy::new(Duration::from_millis(10), 3),
        ConstraintSnapshot::new(),
    )
}

fn online() -> ConstraintSnapshot {
    [Constraint::NetworkConnected].into_iter().collect()
}

fn ticket_of(step: &ChainStep, id: workchain::chain::TaskId) -> u64 {
    step.scheduled
        .iter()
        .find(|t| t.id == id)
        .map(|t| t.ticket)
        .expect("task was not scheduled in this step")
}

#[test]
fn first_task_runs_and_the_rest_wait() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let b = spec(TaskKind::Blur);
    let (a_id, b_id) = (a.id(), b.id());

    let (handle, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a).then(b))
        .unwrap();

    assert_eq!(handle.outcome, SubmitOutcome::Started);
    assert_eq!(handle.task_ids, vec![a_id, b_id]);
    assert_eq!(step.scheduled.len(), 1);
    assert_eq!(step.scheduled[0].id, a_id);
    assert_eq!(step.scheduled[0].attempt, 1);
    assert_eq!(table.status_of(a_id), TaskStatus::Running);
    assert_eq!(table.status_of(b_id), TaskStatus::Blocked);

    // First update is the freshly created record: first ENQUEUED, rest BLOCKED.
    let first = &step.updates[0].snapshot;
    assert_eq!(first.status_of(a_id), TaskStatus::Enqueued);
    assert_eq!(first.status_of(b_id), TaskStatus::Blocked);
}

#[test]
fn success_propagates_output_into_next_input() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let b = TaskSpec::builder(TaskKind::Blur)
        .input("radius", 5)
        .input("image_uri", "declared")
        .build();
    let (a_id, b_id) = (a.id(), b.id());

    let (_, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a).then(b))
        .unwrap();

    let output = Data::new().with("image_uri", "file:///l1");
    let step = table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::Success(output));

    assert_eq!(table.status_of(a_id), TaskStatus::Succeeded);
    assert_eq!(table.status_of(b_id), TaskStatus::Running);
    let scheduled = &step.scheduled[0];
    assert_eq!(scheduled.id, b_id);
    // Preceding output wins over declared input; other declared keys stay.
    assert_eq!(scheduled.input.get_str("image_uri"), Some("file:///l1"));
    assert_eq!(scheduled.input.get_i64("radius"), Some(5));
}

#[test]
fn failure_cancels_every_later_task() {
    let mut table = table();
    let chain = Chain::from_tasks(vec![
        spec(TaskKind::Download),
        spec(TaskKind::Blur),
        spec(TaskKind::ColorFilter),
    ]);
    let ids = chain.task_ids();

    let (_, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, chain)
        .unwrap();
    let step = table.task_completed(
        ids[0],
        ticket_of(&step, ids[0]),
        TaskResult::failure("boom"),
    );

    assert!(step.scheduled.is_empty());
    let snapshot = table.snapshot("pipeline").unwrap();
    assert!(snapshot.terminal);
    assert_eq!(snapshot.status_of(ids[0]), TaskStatus::Failed);
    assert_eq!(snapshot.task(ids[0]).unwrap().error.as_deref(), Some("boom"));
    assert_eq!(snapshot.status_of(ids[1]), TaskStatus::Cancelled);
    assert_eq!(snapshot.status_of(ids[2]), TaskStatus::Cancelled);
    assert!(snapshot.task(ids[1]).unwrap().output.is_none());
}

#[test]
fn keep_returns_the_active_chain_and_discards_the_new_one() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let a_id = a.id();
    table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();

    let other = spec(TaskKind::Download);
    let other_id = other.id();
    let (handle, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(other))
        .unwrap();

    assert_eq!(handle.outcome, SubmitOutcome::Kept);
    assert_eq!(handle.task_ids, vec![a_id]);
    assert!(step.is_empty());
    assert_eq!(table.status_of(other_id), TaskStatus::Unknown);
}

#[test]
fn keep_after_completion_starts_a_fresh_record() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let a_id = a.id();
    let (first, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::success());

    let (second, step) = table
        .submit(
            "pipeline",
            ExistingChainPolicy::Keep,
            Chain::new(spec(TaskKind::Download)),
        )
        .unwrap();

    assert_eq!(second.outcome, SubmitOutcome::Started);
    assert_ne!(second.record, first.record);
    assert_eq!(step.scheduled.len(), 1);
}

#[test]
fn replace_cancels_the_active_chain_before_starting() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let b = spec(TaskKind::Blur);
    let (a_id, b_id) = (a.id(), b.id());
    let (first, _) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a).then(b))
        .unwrap();

    let c = spec(TaskKind::ColorFilter);
    let c_id = c.id();
    let (handle, step) = table
        .submit("pipeline", ExistingChainPolicy::Replace, Chain::new(c))
        .unwrap();

    assert_eq!(handle.outcome, SubmitOutcome::Replaced);
    assert_ne!(handle.record, first.record);
    assert_eq!(step.stopped, vec![a_id]);
    assert_eq!(step.scheduled[0].id, c_id);

    // The old record finishes (terminal update) before the new one publishes.
    let old_terminal = step
        .updates
        .iter()
        .position(|u| u.snapshot.record == first.record && u.snapshot.terminal)
        .expect("old record reached a terminal update");
    let new_first = step
        .updates
        .iter()
        .position(|u| u.snapshot.record == handle.record)
        .expect("new record published");
    assert!(old_terminal < new_first);

    let old = &step.updates[old_terminal].snapshot;
    assert_eq!(old.status_of(a_id), TaskStatus::Cancelled);
    assert_eq!(old.status_of(b_id), TaskStatus::Cancelled);
}

#[test]
fn append_runs_after_the_active_chain_even_if_it_fails() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let a2 = spec(TaskKind::Blur);
    let (a_id, a2_id) = (a.id(), a2.id());
    let (first, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a).then(a2))
        .unwrap();

    let b = TaskSpec::builder(TaskKind::Download).input("source", "B").build();
    let b_id = b.id();
    let (handle, append_step) = table
        .submit("pipeline", ExistingChainPolicy::Append, Chain::new(b))
        .unwrap();

    assert_eq!(handle.outcome, SubmitOutcome::Appended);
    assert_eq!(handle.record, first.record);
    assert!(append_step.scheduled.is_empty());
    assert_eq!(table.status_of(b_id), TaskStatus::Blocked);

    let step = table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::failure("nope"));

    // The failure only cancels the rest of its own chain.
    assert_eq!(table.status_of(a2_id), TaskStatus::Cancelled);
    assert_eq!(table.status_of(b_id), TaskStatus::Running);
    let scheduled = &step.scheduled[0];
    assert_eq!(scheduled.id, b_id);
    assert_eq!(scheduled.input.get_str("source"), Some("B"));
}

#[test]
fn append_without_an_active_chain_just_starts() {
    let mut table = table();
    let (handle, step) = table
        .submit(
            "pipeline",
            ExistingChainPolicy::Append,
            Chain::new(spec(TaskKind::Download)),
        )
        .unwrap();

    assert_eq!(handle.outcome, SubmitOutcome::Started);
    assert_eq!(step.scheduled.len(), 1);
}

#[test]
fn malformed_submissions_are_rejected() {
    let mut table = table();

    let err = table
        .submit("  ", ExistingChainPolicy::Keep, Chain::new(spec(TaskKind::Download)))
        .unwrap_err();
    assert!(matches!(err, WorkchainError::InvalidArgument(_)));

    let err = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::from_tasks(vec![]))
        .unwrap_err();
    assert!(matches!(err, WorkchainError::InvalidArgument(_)));

    let a = spec(TaskKind::Download);
    let err = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a.clone()).then(a))
        .unwrap_err();
    assert!(matches!(err, WorkchainError::InvalidArgument(_)));

    assert!(table.is_idle());
}

#[test]
fn task_ids_cannot_be_shared_between_active_chains() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    table
        .submit("first", ExistingChainPolicy::Keep, Chain::new(a.clone()))
        .unwrap();

    let err = table
        .submit("second", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap_err();
    match err {
        WorkchainError::InvalidArgument(msg) => assert!(msg.contains("first")),
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[test]
fn retry_backs_off_and_re_runs_the_task() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let a_id = a.id();
    let (_, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();

    let step = table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::Retry);
    assert_eq!(table.status_of(a_id), TaskStatus::Enqueued);
    assert!(step.scheduled.is_empty());
    assert_eq!(step.wakes.len(), 1);
    assert_eq!(step.wakes[0].delay, Duration::from_millis(10));

    let wake = step.wakes[0];
    let step = table.wake_due(a_id, wake.ticket);
    assert_eq!(table.status_of(a_id), TaskStatus::Running);
    assert_eq!(step.scheduled[0].attempt, 2);

    let snapshot = table.snapshot("pipeline").unwrap();
    assert_eq!(snapshot.task(a_id).unwrap().retries, 1);
}

#[test]
fn retry_cap_turns_the_next_retry_into_failure() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let b = spec(TaskKind::Blur);
    let (a_id, b_id) = (a.id(), b.id());
    let (_, mut step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a).then(b))
        .unwrap();

    for _ in 0..3 {
        let retried = table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::Retry);
        let wake = retried.wakes[0];
        step = table.wake_due(a_id, wake.ticket);
    }
    table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::Retry);

    let snapshot = table.snapshot("pipeline").unwrap();
    let info = snapshot.task(a_id).unwrap();
    assert_eq!(info.status, TaskStatus::Failed);
    assert_eq!(info.retries, 3);
    assert_eq!(info.error.as_deref(), Some("max retries exceeded (3)"));
    assert_eq!(snapshot.status_of(b_id), TaskStatus::Cancelled);
}

#[test]
fn backoff_delays_grow_and_are_capped() {
    let exponential = RetryPolicy::new(Duration::from_secs(30), 10)
        .with_max_delay(Duration::from_secs(200));
    assert_eq!(exponential.delay_for(1), Duration::from_secs(30));
    assert_eq!(exponential.delay_for(2), Duration::from_secs(60));
    assert_eq!(exponential.delay_for(3), Duration::from_secs(120));
    assert_eq!(exponential.delay_for(4), Duration::from_secs(200));
    assert_eq!(exponential.delay_for(64), Duration::from_secs(200));

    let linear = RetryPolicy::new(Duration::from_secs(30), 10).with_backoff(BackoffPolicy::Linear);
    assert_eq!(linear.delay_for(1), Duration::from_secs(30));
    assert_eq!(linear.delay_for(3), Duration::from_secs(90));
}

#[test]
fn stale_results_are_discarded() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let a_id = a.id();
    let (_, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    let ticket = ticket_of(&step, a_id);

    let step = table.task_completed(a_id, ticket + 7, TaskResult::success());
    assert!(step.is_empty());
    assert_eq!(table.status_of(a_id), TaskStatus::Running);

    table.task_completed(a_id, ticket, TaskResult::success());
    assert_eq!(table.status_of(a_id), TaskStatus::Succeeded);
}

#[test]
fn unmet_constraints_block_until_they_are_met() {
    let mut table = table();
    let a = networked(TaskKind::Download);
    let a_id = a.id();

    let (_, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    assert!(step.scheduled.is_empty());
    assert_eq!(table.status_of(a_id), TaskStatus::Blocked);

    let step = table.constraints_changed(online());
    assert_eq!(step.scheduled.len(), 1);
    assert_eq!(table.status_of(a_id), TaskStatus::Running);
}

#[test]
fn losing_constraints_while_running_bounces_back_to_blocked() {
    let mut table = ChainTable::new(RetryPolicy::default(), online());
    let a = networked(TaskKind::Download);
    let a_id = a.id();

    let (_, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    let first_ticket = ticket_of(&step, a_id);

    let step = table.constraints_changed(ConstraintSnapshot::new());
    assert_eq!(step.stopped, vec![a_id]);
    assert_eq!(table.status_of(a_id), TaskStatus::Blocked);

    // The stopped attempt's result no longer counts.
    table.task_completed(a_id, first_ticket, TaskResult::success());
    assert_eq!(table.status_of(a_id), TaskStatus::Blocked);

    let step = table.constraints_changed(online());
    assert_eq!(table.status_of(a_id), TaskStatus::Running);
    assert_eq!(step.scheduled[0].attempt, 1);

    let snapshot = table.snapshot("pipeline").unwrap();
    assert_eq!(snapshot.task(a_id).unwrap().retries, 0);
}

#[test]
fn initial_delay_holds_the_task_enqueued() {
    let mut table = table();
    let a = TaskSpec::builder(TaskKind::Download)
        .initial_delay(Duration::from_millis(50))
        .build();
    let a_id = a.id();

    let (_, step) = table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    assert!(step.scheduled.is_empty());
    assert_eq!(step.wakes[0].delay, Duration::from_millis(50));
    assert_eq!(table.status_of(a_id), TaskStatus::Enqueued);

    let step = table.wake_due(a_id, step.wakes[0].ticket);
    assert_eq!(step.scheduled.len(), 1);
    assert_eq!(table.status_of(a_id), TaskStatus::Running);
}

#[test]
fn cancel_stops_running_work_and_cancels_the_rest() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let b = spec(TaskKind::Blur);
    let (a_id, b_id) = (a.id(), b.id());
    table
        .submit("pipeline", ExistingChainPolicy::Keep, Chain::new(a).then(b))
        .unwrap();

    let step = table.cancel("pipeline");
    assert_eq!(step.stopped, vec![a_id]);
    assert_eq!(table.status_of(a_id), TaskStatus::Cancelled);
    assert_eq!(table.status_of(b_id), TaskStatus::Cancelled);
    assert!(table.is_idle());

    assert!(table.cancel("missing").is_empty());
}

#[test]
fn prune_drops_only_finished_chains() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let a_id = a.id();
    let (_, step) = table
        .submit("done", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::success());

    let live = spec(TaskKind::Download);
    let live_id = live.id();
    table
        .submit("live", ExistingChainPolicy::Keep, Chain::new(live))
        .unwrap();

    let report = table.prune();
    assert_eq!(report.chains, vec!["done".to_string()]);
    assert_eq!(report.tasks, vec![a_id]);
    assert_eq!(table.status_of(a_id), TaskStatus::Unknown);
    assert!(table.snapshot("done").is_none());
    assert_eq!(table.status_of(live_id), TaskStatus::Running);
}

#[test]
fn prune_reports_ids_of_superseded_records() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let a_id = a.id();
    let (_, step) = table
        .submit("p", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    table.task_completed(a_id, ticket_of(&step, a_id), TaskResult::success());

    let b = spec(TaskKind::Download);
    let b_id = b.id();
    let (handle, _) = table
        .submit("p", ExistingChainPolicy::Keep, Chain::new(b))
        .unwrap();
    assert_eq!(handle.outcome, SubmitOutcome::Started);
    assert_eq!(table.status_of(a_id), TaskStatus::Unknown);

    // Still running, so only the superseded id goes.
    let report = table.prune();
    assert!(report.chains.is_empty());
    assert_eq!(report.tasks, vec![a_id]);
    assert_eq!(table.status_of(b_id), TaskStatus::Running);

    assert!(table.prune().tasks.is_empty());
}

#[test]
fn prune_keeps_a_superseded_id_that_was_submitted_again() {
    let mut table = table();
    let chain = Chain::new(spec(TaskKind::Download));
    let id = chain.task_ids()[0];

    let (_, step) = table
        .submit("p", ExistingChainPolicy::Keep, chain.clone())
        .unwrap();
    table.task_completed(id, ticket_of(&step, id), TaskResult::success());
    table
        .submit("p", ExistingChainPolicy::Keep, chain)
        .unwrap();

    let report = table.prune();
    assert!(report.tasks.is_empty());
    assert_eq!(table.status_of(id), TaskStatus::Running);
}

#[test]
fn chains_under_different_names_run_side_by_side() {
    let mut table = table();
    let a = spec(TaskKind::Download);
    let b = spec(TaskKind::Download);

    let (_, first) = table
        .submit("one", ExistingChainPolicy::Keep, Chain::new(a))
        .unwrap();
    let (_, second) = table
        .submit("two", ExistingChainPolicy::Keep, Chain::new(b))
        .unwrap();

    assert_eq!(first.scheduled.len(), 1);
    assert_eq!(second.scheduled.len(), 1);
    assert_eq!(table.running_tasks().len(), 2);

    let mut names: Vec<&str> = table.chain_names().collect();
    names.sort();
    assert_eq!(names, vec!["one", "two"]);
}
