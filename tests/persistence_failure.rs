// tests/persistence_failure.rs

use std::error::Error;
use std::sync::Arc;

use pipeflow::engine::{Engine, EngineOptions};
use pipeflow::params::{Parameters, render_script};
use pipeflow::store::GraphStore;
use pipeflow::types::{PipelineState, TrackState};
use pipeflow_test_utils::builders::GraphBuilder;
use pipeflow_test_utils::failing_store::FailingStore;
use pipeflow_test_utils::fake_runner::FakeRunner;
use pipeflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn dropped_result_leaves_track_running_and_nothing_partial() -> TestResult {
    init_tracing();
    let store = Arc::new(FailingStore::new());
    let g = GraphBuilder::on(store.clone(), "chain")
        .chain(&["A", "B"])
        .build();
    let p = g.start("p");

    let runner = FakeRunner::new();
    let engine = Engine::start(g.store.clone(), Arc::new(runner.clone()), EngineOptions::default());
    let progress = engine.progress();

    let a = g.track(p.id, "A");
    render_script(g.store.as_ref(), a.id, Some(r#"{"script": "echo A"}"#), &Parameters::new())?;

    store.fail_result_writes();
    engine.submit(a.id)?;
    with_timeout(progress.notified()).await;

    assert_eq!(runner.executed(), vec!["echo A"]);
    let a = g.track(p.id, "A");
    assert_eq!(a.state, TrackState::Running);
    assert!(a.output.is_none());
    assert_eq!(g.track(p.id, "B").state, TrackState::Waiting);
    assert_eq!(store.pipeline(p.id)?.state, PipelineState::Running);

    engine.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn store_failure_on_submit_leaves_track_pending() -> TestResult {
    init_tracing();
    let store = Arc::new(FailingStore::new());
    let g = GraphBuilder::on(store.clone(), "chain")
        .chain(&["A", "B"])
        .build();
    let p = g.start("p");

    let runner = FakeRunner::new();
    let engine = Engine::start(g.store.clone(), Arc::new(runner.clone()), EngineOptions::default());

    let a = g.track(p.id, "A");
    render_script(g.store.as_ref(), a.id, Some(r#"{"script": "echo A"}"#), &Parameters::new())?;

    store.fail_batches_where(|_| true);
    assert!(engine.submit(a.id).is_err());
    store.heal();

    engine.shutdown().await;
    assert!(runner.executed().is_empty());
    assert_eq!(g.track(p.id, "A").state, TrackState::Pending);
    Ok(())
}
