// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod preview;
pub mod tasks;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigProvider, FileConfigProvider};
use crate::engine::{Composer, GraphRunner, TaskGraph};
use crate::paths::PathSet;
use crate::preview::PreviewService;
use crate::tasks::TaskContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - path layout and config loading
/// - the graph for the selected target
/// - the graph runner
///
/// Returns whether every task of the graph completed.
pub async fn run(args: CliArgs) -> Result<bool> {
    let mut paths = PathSet::from_root(&args.root);
    if let Some(config) = &args.config {
        paths.theme_config = config.clone();
    }
    let paths = Arc::new(paths);

    let provider: Arc<dyn ConfigProvider> = Arc::new(FileConfigProvider::new(
        &paths.theme_config,
        &paths.style_variables,
    ));
    // Fail fast on a broken config; tasks re-read it on every run.
    let config = provider.load()?;
    info!(slug = %config.slug, name = %config.name, target = ?args.task, "theme loaded");

    let composer = Composer::new(Arc::clone(&paths), Arc::new(PreviewService::new()));
    let graph = composer.for_target(args.task)?;

    if args.dry_run {
        print_dry_run(&composer, &graph)?;
        return Ok(true);
    }

    let runner = GraphRunner::new(TaskContext::new(provider, paths));
    let outcome = runner.run(&graph).await;

    for record in &outcome.records {
        debug!(task = %record.name, state = ?record.state, "final task state");
    }
    Ok(outcome.succeeded())
}

/// Simple dry-run output: the graph tree and the watch bindings.
fn print_dry_run(composer: &Composer, graph: &TaskGraph) -> Result<()> {
    println!("rigbuild dry-run");
    println!();
    println!("graph:");
    for line in graph.describe().lines() {
        println!("  {line}");
    }
    println!();

    let bindings = composer.watch_bindings()?;
    println!("watch bindings ({}):", bindings.len());
    for binding in &bindings {
        println!("  - {}", binding.name);
        println!("      watch: {:?}", binding.patterns.patterns());
        println!("      runs: {:?}", binding.graph.task_names());
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
