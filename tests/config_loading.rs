// tests/config_loading.rs

mod common;
use crate::common::builders::{ChainConfigBuilder, ConfigFileBuilder, TaskConfigBuilder};

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tempfile::NamedTempFile;
use workchain::chain::{Constraint, TaskKind};
use workchain::cli::{CliArgs, LogLevel};
use workchain::config::{ConfigFile, load_and_validate, load_from_path, load_with_fs};
use workchain::errors::WorkchainError;
use workchain::fs::MockFileSystem;
use workchain::types::{BackoffPolicy, ExistingChainPolicy};

const FULL: &str = r#"
[scheduler]
backoff = "linear"
base_delay_ms = 200
max_delay_ms = 1000
max_retries = 5

[artifacts]
dir = "/tmp/workchain-artifacts"

[network]
probe = "1.1.1.1:53"
probe_interval_ms = 750

[constraints]
satisfied = ["charging"]

[chain.pipeline]
policy = "replace"

[[chain.pipeline.task]]
kind = "download"
constraints = ["network_connected"]
input = { source = "https://example.com/a.raw" }

[[chain.pipeline.task]]
kind = "blur"
initial_delay_ms = 250
input = { radius = 5 }

[[chain.pipeline.task]]
kind = "color_filter"
constraints = ["charging"]
input = { scale = 1.5 }
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn parse(contents: &str) -> Result<ConfigFile, WorkchainError> {
    let fs = MockFileSystem::new();
    fs.add_file("/cfg/Workchain.toml", contents);
    let raw = load_with_fs(&fs, "/cfg/Workchain.toml")?;
    ConfigFile::try_from(raw)
}

fn config_error(contents: &str) -> String {
    match parse(contents) {
        Err(WorkchainError::ConfigError(msg)) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn full_config_loads_from_disk() {
    let file = write_config(FULL);
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.scheduler.backoff, BackoffPolicy::Linear);
    let retry = cfg.scheduler.retry_policy();
    assert_eq!(retry.base_delay, Duration::from_millis(200));
    assert_eq!(retry.max_delay, Duration::from_millis(1000));
    assert_eq!(retry.max_retries, 5);
    assert_eq!(retry.delay_for(3), Duration::from_millis(600));

    assert_eq!(cfg.artifacts.dir, PathBuf::from("/tmp/workchain-artifacts"));
    assert_eq!(cfg.network.probe.as_deref(), Some("1.1.1.1:53"));
    assert_eq!(cfg.network.probe_interval_ms, 750);
    assert_eq!(cfg.network.probe_timeout_ms, 2_000);
    assert_eq!(
        cfg.constraints.satisfied,
        vec![Constraint::Custom("charging".to_string())]
    );

    let pipeline = &cfg.chain["pipeline"];
    assert_eq!(pipeline.policy, ExistingChainPolicy::Replace);
    let kinds: Vec<TaskKind> = pipeline.tasks.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TaskKind::Download, TaskKind::Blur, TaskKind::ColorFilter]
    );
}

#[test]
fn chain_config_builds_task_specs() {
    let cfg = parse(FULL).unwrap();
    let chain = cfg.chain["pipeline"].to_chain();
    let tasks = chain.tasks();

    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].constraints(), &[Constraint::NetworkConnected]);
    assert_eq!(
        tasks[0].input().get_str("source"),
        Some("https://example.com/a.raw")
    );
    assert_eq!(tasks[0].initial_delay(), None);
    assert_eq!(tasks[1].input().get_i64("radius"), Some(5));
    assert_eq!(tasks[1].initial_delay(), Some(Duration::from_millis(250)));
    assert_eq!(tasks[2].input().get_f64("scale"), Some(1.5));

    // Every call allocates fresh ids.
    let again = cfg.chain["pipeline"].to_chain();
    assert!(
        chain
            .task_ids()
            .iter()
            .all(|id| !again.task_ids().contains(id))
    );
}

#[test]
fn omitted_sections_use_defaults() {
    let cfg = parse(
        r#"
[[chain.solo.task]]
kind = "download"
"#,
    )
    .unwrap();

    assert_eq!(cfg.scheduler.backoff, BackoffPolicy::Exponential);
    assert_eq!(cfg.scheduler.base_delay_ms, 30_000);
    assert_eq!(cfg.scheduler.max_retries, 3);
    assert_eq!(cfg.artifacts.dir, PathBuf::from(".workchain/artifacts"));
    assert!(cfg.network.probe.is_none());
    assert!(cfg.constraints.satisfied.is_empty());
    assert_eq!(cfg.chain["solo"].policy, ExistingChainPolicy::Keep);
}

#[test]
fn max_attempts_is_accepted_as_an_alias() {
    let cfg = parse(
        r#"
[scheduler]
max_attempts = 7

[[chain.solo.task]]
kind = "blur"
"#,
    )
    .unwrap();

    assert_eq!(cfg.scheduler.max_retries, 7);
}

#[test]
fn config_without_chains_is_rejected() {
    let msg = config_error("[scheduler]\nmax_retries = 2\n");
    assert!(msg.contains("at least one [chain.<name>]"));
}

#[test]
fn chain_without_tasks_is_rejected() {
    let msg = config_error("[chain.empty]\npolicy = \"append\"\n");
    assert!(msg.contains("chain 'empty'"));
}

#[test]
fn max_delay_below_base_delay_is_rejected() {
    let msg = config_error(
        r#"
[scheduler]
base_delay_ms = 500
max_delay_ms = 100

[[chain.solo.task]]
kind = "download"
"#,
    );
    assert!(msg.contains("max_delay_ms"));
}

#[test]
fn probe_settings_are_checked() {
    let msg = config_error(
        r#"
[network]
probe = "  "

[[chain.solo.task]]
kind = "download"
"#,
    );
    assert!(msg.contains("[network].probe"));

    let msg = config_error(
        r#"
[network]
probe = "example.com:80"
probe_timeout_ms = 0

[[chain.solo.task]]
kind = "download"
"#,
    );
    assert!(msg.contains("probe_timeout_ms"));
}

#[test]
fn unknown_task_kind_is_a_toml_error() {
    let err = parse(
        r#"
[[chain.solo.task]]
kind = "sharpen"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, WorkchainError::TomlError(_)));
}

#[test]
fn unknown_policy_is_a_toml_error() {
    let err = parse(
        r#"
[chain.solo]
policy = "merge"

[[chain.solo.task]]
kind = "download"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, WorkchainError::TomlError(_)));
}

#[test]
fn missing_file_is_a_config_error() {
    let err = load_from_path("/definitely/not/here/Workchain.toml").unwrap_err();
    match err {
        WorkchainError::ConfigError(msg) => assert!(msg.starts_with("cannot read")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn builder_produces_a_valid_config() {
    let cfg = ConfigFileBuilder::new()
        .with_retry(10, 4)
        .with_chain(
            "pipeline",
            ChainConfigBuilder::new(ExistingChainPolicy::Append)
                .task(
                    TaskConfigBuilder::new(TaskKind::Download)
                        .constraint(Constraint::NetworkConnected)
                        .input("source", "file:///tmp/a.raw")
                        .build(),
                )
                .task(TaskConfigBuilder::new(TaskKind::Blur).build())
                .build(),
        )
        .build();

    assert_eq!(cfg.scheduler.retry_policy().max_retries, 4);
    assert_eq!(cfg.chain["pipeline"].to_chain().len(), 2);

    let invalid = ConfigFileBuilder::new().with_max_delay(1).raw();
    assert!(ConfigFile::try_from(invalid).is_err());
}

#[test]
fn policies_parse_from_strings() {
    assert_eq!(
        " Replace ".parse::<ExistingChainPolicy>().unwrap(),
        ExistingChainPolicy::Replace
    );
    assert!("merge".parse::<ExistingChainPolicy>().is_err());
    assert_eq!(
        "linear".parse::<BackoffPolicy>().unwrap(),
        BackoffPolicy::Linear
    );
    assert_eq!(
        "network".parse::<Constraint>().unwrap(),
        Constraint::NetworkConnected
    );
    assert!("".parse::<Constraint>().is_err());

    assert_eq!(ExistingChainPolicy::default(), ExistingChainPolicy::Keep);
    assert_eq!(BackoffPolicy::default(), BackoffPolicy::Exponential);
}

#[test]
fn cli_flags_parse() {
    let args = CliArgs::try_parse_from([
        "workchain",
        "--config",
        "chains.toml",
        "--chain",
        "pipeline",
        "--log-level",
        "debug",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.config, "chains.toml");
    assert_eq!(args.chain.as_deref(), Some("pipeline"));
    assert_eq!(args.log_level, Some(LogLevel::Debug));
    assert_eq!(args.config_path(), PathBuf::from("chains.toml"));
    assert!(args.dry_run);

    let defaults = CliArgs::try_parse_from(["workchain"]).unwrap();
    assert_eq!(defaults.config, "Workchain.toml");
    assert!(defaults.chain.is_none());
    assert!(!defaults.dry_run);
}
