// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod notify_sink;
pub mod scaffold;
pub mod transform;
pub mod types;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::cli::{CliArgs, Task};
use crate::config::{ConfigLoader, ConfigSnapshot};
use crate::engine::{
    Aggregator, AggregatorBackend, RuntimeEvent, RuntimeOptions, TaskId, WatchCore, WatchRuntime,
};
use crate::errors::BasisError;
use crate::exec::Executor;
use crate::notify_sink::{LogSink, NotificationSink};
use crate::transform::TransformRegistry;
use crate::types::TransformKind;
use crate::watch::NotifyWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - transform registry / executor / aggregator
/// - (for `watch`) file watcher, watch runtime and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let registry = TransformRegistry::with_command_toolchain();
    let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);

    match args.task {
        Task::Config => {
            let snapshot = ConfigLoader::new(&args.config)?.load()?;
            print_config(&snapshot);
            Ok(())
        }
        Task::Watch => watch(&args, registry, sink).await,
        Task::Default => {
            let aggregator = Aggregator::new(
                Executor::new(registry.clone(), Arc::clone(&sink)),
                Arc::clone(&sink),
            );
            let build = match ConfigLoader::new(&args.config).and_then(|mut l| l.load()) {
                Ok(snapshot) => run_build(&aggregator, &args.task.build_kinds(), &snapshot).await,
                Err(e) => Err(e),
            };
            if let Err(e) = build {
                error!("initial build failed; watching anyway: {e}");
            }
            watch(&args, registry, sink).await
        }
        task => {
            let aggregator = Aggregator::new(Executor::new(registry, Arc::clone(&sink)), sink);
            let snapshot = ConfigLoader::new(&args.config)?.load()?;
            run_build(&aggregator, &task.build_kinds(), &snapshot).await?;
            Ok(())
        }
    }
}

/// Run the given kinds once, concurrently, and print a summary per task.
///
/// Fails if any transform failed: with the task's `AggregateFailure` when a
/// single task failed, with `TasksFailed` naming every failed task otherwise.
pub async fn run_build(
    aggregator: &Aggregator,
    kinds: &[TransformKind],
    snapshot: &ConfigSnapshot,
) -> std::result::Result<(), BasisError> {
    let handles: Vec<_> = kinds
        .iter()
        .map(|&kind| aggregator.run_task(TaskId::Build(kind), snapshot))
        .collect();

    let mut failures = Vec::new();
    for handle in handles {
        let task = handle.task();
        let report = handle.wait().await?;
        let total = report.outcomes.len();
        match report.into_result() {
            Ok(_) => println!("ok     {task} ({total} transform(s))"),
            Err(e) => {
                println!("FAILED {task}");
                failures.push((task, e));
            }
        }
    }

    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0).1),
        _ => {
            for (_, err) in &failures {
                error!("{err}");
            }
            Err(BasisError::TasksFailed(
                failures.iter().map(|(task, _)| task.to_string()).collect(),
            ))
        }
    }
}

async fn watch(
    args: &CliArgs,
    registry: TransformRegistry,
    sink: Arc<dyn NotificationSink>,
) -> Result<()> {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    let loader = ConfigLoader::new(&args.config)?;
    let core = WatchCore::start(loader, registry.clone());

    let watcher = NotifyWatcher::new(rt_tx.clone())?;
    let executor = Executor::new(registry, Arc::clone(&sink));
    let backend = AggregatorBackend::new(Aggregator::new(executor, sink));

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let options = RuntimeOptions {
        debounce: Duration::from_millis(args.debounce_ms),
    };
    info!(config = %args.config.display(), "watching for changes (Ctrl-C to stop)");

    let runtime = WatchRuntime::new(core, rt_rx, backend, watcher, options);
    runtime.run().await?;
    Ok(())
}

/// `basis config` output: preset, minify, modules and their descriptors.
fn print_config(snapshot: &ConfigSnapshot) {
    let cfg = &snapshot.config;
    println!("basis configuration ({})", snapshot.path.display());
    println!("  preset = {}", cfg.preset);
    println!("  minify = {}", cfg.minify);
    println!("  server.module = {}", cfg.server.module);
    println!("  client.module = {}", cfg.client.module);
    println!(
        "  styles.style = {}, sourcemap = {}",
        cfg.styles.style, cfg.styles.sourcemap
    );
    println!();

    println!("modules ({}):", cfg.modules.len());
    for module in &cfg.modules {
        println!("  - {}", module.name);
        println!("      path: {}", module.base_path.display());
        println!("      build dir: {}", module.build_dir(cfg.preset).display());
        for kind in TransformKind::ALL {
            for d in module.descriptors(kind) {
                println!("      {kind}: {} -> {}", d.source, d.dest.display());
            }
        }
    }
}
