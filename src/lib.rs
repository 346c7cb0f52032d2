// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod params;
pub mod store;
pub mod types;
pub mod view;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, import_graph, load_and_validate};
use crate::dag::{GraphValidator, start_pipeline};
use crate::driver::Driver;
use crate::engine::{Engine, EngineOptions};
use crate::exec::ShellRunner;
use crate::params::StaticParameters;
use crate::store::{GraphStore, MemoryStore};
use crate::types::{PipelineId, PipelineState};
use crate::view::pipeline_view;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and graph import
/// - DAG validation and pipeline instantiation
/// - the execution engine with a shell runner
/// - the driver loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;

    let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
    let graph = import_graph(store.as_ref(), &cfg)?;

    let validator = GraphValidator::new(store.clone());
    let swept = validator.validate_all()?;
    debug!(?swept, "validation sweep complete");
    validator.ensure_valid(graph.id)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let source = StaticParameters::parse(args.params.as_slice())?;
    let name = args.name.clone().unwrap_or_else(|| graph.name.clone());
    let pipeline = start_pipeline(store.as_ref(), graph.id, &name, args.desc.as_deref())?;

    let settings = cfg.config();
    let runner = Arc::new(ShellRunner::new(settings.script_timeout));
    let engine = Engine::start(
        store.clone(),
        runner,
        EngineOptions {
            workers: settings.workers,
        },
    );
    let driver = Driver::new(store.clone(), Arc::new(source), settings.poll_interval);

    let outcome = tokio::select! {
        res = driver.run_pipeline(&engine, pipeline.id) => res.map(Some),
        _ = tokio::signal::ctrl_c() => {
            warn!(pipeline = pipeline.id, "interrupted; waiting for running scripts");
            Ok(None)
        }
    };
    engine.shutdown().await;
    let state = outcome?;

    print_summary(store.as_ref(), pipeline.id)?;

    if args.view {
        let view = pipeline_view(store.as_ref(), pipeline.id)?;
        println!("{}", serde_json::to_string_pretty(&view)?);
    }

    match state {
        Some(PipelineState::Finish) => {
            info!(pipeline = pipeline.id, "pipeline finished");
            Ok(())
        }
        Some(state) => bail!("pipeline '{name}' ended {state}"),
        None => bail!("pipeline '{name}' interrupted"),
    }
}

/// Print every track's state and captured output.
fn print_summary(store: &dyn GraphStore, pipeline: PipelineId) -> Result<()> {
    let record = store.pipeline(pipeline)?;
    println!(
        "pipeline {} ({}): {} [{}]",
        record.name,
        record.id,
        record.state,
        record.state.code()
    );

    for track in store.tracks(pipeline, &[])? {
        let vertex = store.vertex(track.vertex_id)?;
        println!("  - {} {} [{}]", vertex.name, track.state, track.state.code());
        if let Some(output) = track.output.as_deref() {
            for line in output.lines() {
                println!("      {line}");
            }
        }
    }
    Ok(())
}

/// Simple dry-run output: print vertices, dependencies and scripts.
fn print_dry_run(cfg: &ConfigFile) {
    let settings = cfg.config();
    println!("pipeflow dry-run");
    println!("  graph = {}", cfg.graph().name);
    println!("  config.workers = {}", settings.workers);
    println!("  config.poll_interval = {:?}", settings.poll_interval);
    if let Some(timeout) = settings.script_timeout {
        println!("  config.script_timeout = {:?}", timeout);
    }
    println!();

    println!("vertices ({}):", cfg.vertices().len());
    for (name, vertex) in cfg.vertices() {
        println!("  - {name}");
        for line in vertex.script.lines().filter(|l| !l.trim().is_empty()) {
            println!("      run: {line}");
        }
        if !vertex.after.is_empty() {
            println!("      after: {:?}", vertex.after);
        }
        for (param, spec) in &vertex.input {
            match &spec.default {
                Some(default) => println!("      input: {param} ({:?}, default {default})", spec.kind),
                None => println!("      input: {param} ({:?})", spec.kind),
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
