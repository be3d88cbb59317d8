// src/lib.rs

pub mod chain;
pub mod cli;
pub mod collab;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod render;
pub mod types;

use std::time::Duration;

use anyhow::{Result, bail};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::{ChainSnapshot, Constraint};
use crate::cli::CliArgs;
use crate::collab::Collaborators;
use crate::config::loader::load_and_validate;
use crate::config::model::{ChainConfig, ConfigFile};
use crate::constraints::{ConstraintMonitor, spawn_network_probe};
use crate::engine::{ChainObserver, RuntimeOptions, spawn_scheduler};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - constraint monitor (and optional network probe)
/// - scheduler runtime + executor
/// - one status printer per submitted chain
/// - Ctrl-C handling (cancels every submitted chain)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(args.config_path())?;

    let selected = select_chains(&cfg, args.chain.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &selected);
        return Ok(());
    }

    let monitor = ConstraintMonitor::with_satisfied(cfg.constraints.satisfied.iter().cloned());
    let _probe = start_network_probe(&cfg, &monitor);

    let collaborators = Collaborators::standard(cfg.artifacts.dir.clone())?;
    let options = RuntimeOptions {
        retry: cfg.scheduler.retry_policy(),
    };
    let (handle, runtime) = spawn_scheduler(options, &monitor, collaborators);

    let mut printers: Vec<JoinHandle<Option<ChainSnapshot>>> = Vec::new();
    for (name, chain_cfg) in selected.iter() {
        let observer = handle.observe(name.as_str())?;
        let submitted = handle
            .submit(name.as_str(), chain_cfg.policy, chain_cfg.to_chain())
            .await?;
        info!(
            chain = %name,
            record = submitted.record,
            outcome = ?submitted.outcome,
            tasks = submitted.task_ids.len(),
            "chain submitted"
        );
        printers.push(tokio::spawn(print_updates(observer)));
    }

    // Ctrl-C → cancel every submitted chain; printers finish on the
    // resulting terminal updates.
    {
        let handle = handle.clone();
        let names: Vec<String> = selected.iter().map(|(name, _)| name.clone()).collect();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling chains");
            for name in names {
                if handle.cancel_chain(name).is_err() {
                    break;
                }
            }
        });
    }

    let mut failed = false;
    for printer in printers {
        match printer.await {
            Ok(Some(snapshot)) => {
                for line in render::output_lines(&snapshot) {
                    println!("{line}");
                }
                failed |= snapshot.tasks.iter().any(|t| t.status != chain::TaskStatus::Succeeded);
            }
            Ok(None) => failed = true,
            Err(e) => {
                warn!(error = %e, "status printer crashed");
                failed = true;
            }
        }
    }

    handle.shutdown()?;
    runtime.await??;

    if failed {
        bail!("one or more chains did not complete successfully");
    }
    Ok(())
}

/// Chains to submit: every configured chain, or only `only`.
fn select_chains(cfg: &ConfigFile, only: Option<&str>) -> Result<Vec<(String, ChainConfig)>> {
    match only {
        Some(name) => match cfg.chain.get(name) {
            Some(chain) => Ok(vec![(name.to_string(), chain.clone())]),
            None => bail!("unknown chain '{name}' (not in config)"),
        },
        None => Ok(cfg
            .chain
            .iter()
            .map(|(name, chain)| (name.clone(), chain.clone()))
            .collect()),
    }
}

fn start_network_probe(cfg: &ConfigFile, monitor: &ConstraintMonitor) -> Option<JoinHandle<()>> {
    match cfg.network.probe.clone() {
        Some(addr) => Some(spawn_network_probe(
            monitor.clone(),
            addr,
            Duration::from_millis(cfg.network.probe_interval_ms),
            Duration::from_millis(cfg.network.probe_timeout_ms),
        )),
        None => {
            debug!("no network probe configured; assuming connectivity");
            monitor.set(Constraint::NetworkConnected, true);
            None
        }
    }
}

/// Print every update of one chain; returns its terminal snapshot.
async fn print_updates(mut observer: ChainObserver) -> Option<ChainSnapshot> {
    while let Some(update) = observer.next().await {
        for line in render::update_lines(&update) {
            println!("{line}");
        }
        if update.snapshot.terminal {
            return Some(update.snapshot);
        }
    }
    None
}

/// Simple dry-run output: print chains, tasks and scheduler settings.
fn print_dry_run(cfg: &ConfigFile, selected: &[(String, ChainConfig)]) {
    println!("workchain dry-run");
    let s = &cfg.scheduler;
    println!(
        "  scheduler: backoff = {:?}, base_delay_ms = {}, max_delay_ms = {}, max_retries = {}",
        s.backoff, s.base_delay_ms, s.max_delay_ms, s.max_retries
    );
    println!("  artifacts.dir = {}", cfg.artifacts.dir.display());
    match cfg.network.probe.as_deref() {
        Some(addr) => println!("  network.probe = {addr}"),
        None => println!("  network.probe = (none, assumed connected)"),
    }
    println!();

    println!("chains ({}):", selected.len());
    for (name, chain) in selected.iter() {
        println!("  - {name} (policy = {})", chain.policy);
        for (i, task) in chain.tasks.iter().enumerate() {
            println!("      {}. {}", i + 1, task.kind);
            if !task.constraints.is_empty() {
                let tags: Vec<String> = task.constraints.iter().map(ToString::to_string).collect();
                println!("         constraints: {}", tags.join(", "));
            }
            if task.initial_delay_ms > 0 {
                println!("         initial_delay_ms: {}", task.initial_delay_ms);
            }
            for (key, value) in task.input.iter() {
                println!("         input.{key} = {value}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
