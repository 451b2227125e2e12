// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod expand;
pub mod fs;
pub mod ledger;
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod samples;
pub mod scratch;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::model::PipelineFile;
use crate::dag::{Budgets, Scheduler, TaskGraph};
use crate::engine::{EngineEvent, Runtime};
use crate::errors::{Result, EXIT_TASK_FAILURE};
use crate::exec::ShellExecutorBackend;
use crate::expand::{BindingUniverse, Instantiator};
use crate::fs::{FileSystem, RealFileSystem};
use crate::ledger::MarkerLedger;
use crate::registry::TemplateRegistry;
use crate::samples::SampleTable;
use crate::scratch::{sanitize_id, ScratchManager};

/// Wildcard dimensions the engine defines values for. `sample` comes from
/// the sample sheet, `read` from `[engine].reads`.
const BUILTIN_DIMENSIONS: &[&str] = &["sample", "read"];

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code: 0 when every task succeeded or was
/// up-to-date, [`EXIT_TASK_FAILURE`] otherwise. Engine errors (bad config,
/// cycles, unsatisfied inputs) are returned as `Err` and carry their own
/// exit codes.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.command {
        Command::Run(run_args) => run_pipeline(run_args).await,
    }
}

async fn run_pipeline(args: RunArgs) -> Result<i32> {
    let mut pipeline = config::load_and_validate(&args.pipeline)?;
    apply_cli_overrides(&mut pipeline, &args);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let table = SampleTable::load(fs.as_ref(), &pipeline.samples)?;
    info!(
        samples = table.len(),
        templates = pipeline.template.len(),
        "pipeline loaded"
    );

    let graph = build_graph(&pipeline, &table, fs.as_ref())?;
    let included = if args.target.is_empty() {
        vec![true; graph.len()]
    } else {
        graph.restrict_to_targets(&args.target)?
    };

    let ledger = MarkerLedger::new(fs.clone(), pipeline.engine.check_mtime);

    if args.dry_run {
        print_plan(&graph, &included, &ledger);
        return Ok(0);
    }

    let budgets = Budgets {
        jobs: pipeline.engine.jobs,
        threads: pipeline.engine.threads,
    };
    let scheduler = Scheduler::with_included(graph, budgets, args.keep_going, included);

    let (rt_tx, rt_rx) = mpsc::channel::<EngineEvent>(64);

    let scratch = ScratchManager::new(
        pipeline.engine.scratch_dir.clone(),
        pipeline.engine.retain_scratch,
    );
    let executor = ShellExecutorBackend::new(rt_tx.clone(), scratch);

    // Ctrl-C stops dispatch of new tasks; in-flight tasks finish.
    let halt_tx = rt_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; requesting halt");
            let _ = halt_tx.send(EngineEvent::HaltRequested).await;
        }
    });

    let runtime = Runtime::new(scheduler, ledger, rt_rx, executor);
    let report = runtime.run().await?;

    println!("{}", report.summary());
    Ok(if report.is_success() { 0 } else { EXIT_TASK_FAILURE })
}

fn apply_cli_overrides(pipeline: &mut PipelineFile, args: &RunArgs) {
    if let Some(samples) = &args.samples {
        pipeline.samples = samples.clone();
    }
    if let Some(jobs) = args.jobs {
        pipeline.engine.jobs = jobs;
    }
    if let Some(threads) = args.threads {
        pipeline.engine.threads = threads;
    }
    if args.retain_scratch {
        pipeline.engine.retain_scratch = true;
    }
}

/// Register every template, expand over the binding universe and resolve the
/// dependency graph.
fn build_graph(
    pipeline: &PipelineFile,
    table: &SampleTable,
    fs: &dyn FileSystem,
) -> Result<TaskGraph> {
    let known = BUILTIN_DIMENSIONS.iter().map(|d| d.to_string()).collect();
    let mut registry = TemplateRegistry::new(known);
    for (name, section) in &pipeline.template {
        registry.register(section.into_template(name)?)?;
    }

    let mut universe = BindingUniverse::new();
    universe.insert_dimension("sample", table.ids().map(str::to_string).collect());
    universe.insert_dimension("read", pipeline.engine.reads.clone());

    let instantiator = Instantiator::new(&universe, table);
    let mut tasks = Vec::new();
    for template in registry.templates() {
        let bindings = instantiator.bindings_for(template)?;
        let mut expanded = instantiator.expand(template, &bindings)?;
        debug!(template = %template.name, tasks = expanded.len(), "template expanded");
        for task in &mut expanded {
            if task.log.is_none() {
                task.log = Some(default_log_path(&pipeline.engine.log_dir, &task.id));
            }
        }
        tasks.append(&mut expanded);
    }

    TaskGraph::resolve(tasks, fs)
}

fn default_log_path(log_dir: &std::path::Path, task_id: &str) -> PathBuf {
    log_dir.join(format!("{}.log", sanitize_id(task_id)))
}

/// Print what a run would do, without executing anything.
fn print_plan(graph: &TaskGraph, included: &[bool], ledger: &MarkerLedger) {
    for &node in graph.topo_order() {
        if !included[node] {
            continue;
        }
        let task = graph.task(node);
        if ledger.is_up_to_date(task) {
            println!("SKIP {} (up-to-date)", task.id);
        } else {
            println!("RUN  {}: {}", task.id, task.command);
        }
    }
}
