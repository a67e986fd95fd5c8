// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod propagator;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_from_path;
use crate::config::model::GraphFile;
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent};
use crate::errors::LoopflowError;
use crate::exec::KernelExecutorBackend;
use crate::graph::GraphView;
use crate::propagator::PropagatorState;
use crate::types::Value;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - graph loading and validation
/// - the propagator and the kernel executor
/// - the runtime event loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let graph_path = PathBuf::from(&args.graph);
    let mut raw = load_from_path(&graph_path)?;
    if let Some(n) = args.parallel_iterations {
        debug!(parallel_iterations = n, "overriding default_parallel_iterations");
        raw.config.default_parallel_iterations = n;
    }
    let cfg = GraphFile::try_from(raw)?;
    let graph = Arc::new(GraphView::from_config(&cfg)?);

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(());
    }

    let report = execute(Arc::clone(&graph)).await?;
    if let Some(failure) = report.failure {
        return Err(LoopflowError::KernelError {
            node: failure.node,
            message: failure.message,
        }
        .into());
    }

    for fetched in report.fetched.iter() {
        println!(
            "{} [frame '{}' iter {}] = {}",
            fetched.node, fetched.frame, fetched.iter, fetched.value
        );
    }
    Ok(())
}

/// Execute `graph` to completion with the kernel executor.
///
/// Kernel failures come back in [`RunReport::failure`]; the error path is
/// reserved for runtime plumbing failures.
pub async fn execute(graph: Arc<GraphView>) -> crate::errors::Result<RunReport> {
    let propagator = Arc::new(PropagatorState::<Value>::new(Arc::clone(&graph)));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = KernelExecutorBackend::new(Arc::clone(&propagator), rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    let mut roots = Vec::new();
    propagator.activate_roots(graph.roots(), &mut roots);

    let core = CoreRuntime::new(graph.fetch().iter().copied());
    let report = Runtime::new(core, rt_rx, executor).run(roots).await?;

    let stats = propagator.stats();
    info!(
        frames_created = stats.frames_created,
        frames_deleted = stats.frames_deleted,
        iterations_started = stats.iterations_started,
        iterations_retired = stats.iterations_retired,
        "run finished"
    );
    if report.failure.is_none() && !report.interrupted && !propagator.is_finished() {
        warn!("run went idle with live frames left");
        propagator.dump_state();
    }
    Ok(report)
}

/// Simple dry-run output: print nodes and static frames.
fn print_dry_run(cfg: &GraphFile, graph: &GraphView) {
    println!("loopflow dry-run");
    println!(
        "  config.default_parallel_iterations = {}",
        cfg.config.default_parallel_iterations
    );
    if !cfg.config.fetch.is_empty() {
        println!("  config.fetch = {:?}", cfg.config.fetch);
    }
    println!();

    println!("nodes ({}):", graph.nodes().len());
    for item in graph.nodes() {
        println!("  - {} ({})", item.name, item.op);
        if let Some(node) = cfg.node.get(&item.name) {
            if !node.inputs.is_empty() {
                println!("      inputs: {:?}", node.inputs);
            }
        }
        if let Some(value) = item.value {
            println!("      value: {value}");
        }
        if let Some(ref frame_name) = item.frame_name {
            println!("      enters: {frame_name}");
        }
        if let Some(n) = item.parallel_iterations {
            println!("      parallel_iterations: {n}");
        }
        if item.is_constant_enter {
            println!("      is_constant: true");
        }
    }
    println!();

    let frames = graph.frame_infos();
    println!("frames ({}):", frames.len());
    for info in frames {
        let name = if info.name.is_empty() { "<root>" } else { info.name.as_str() };
        let members: Vec<&str> = info
            .nodes
            .iter()
            .map(|&id| graph.node(id).name.as_str())
            .collect();
        println!("  - {name}");
        if let Some(ref parent) = info.parent {
            let parent = if parent.is_empty() { "<root>" } else { parent.as_str() };
            println!("      parent: {parent}");
        }
        println!("      enter inputs: {}", info.input_count);
        println!("      nodes: {members:?}");
    }

    debug!("dry-run complete (no execution)");
}
