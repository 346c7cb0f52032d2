// tests/engine_fake_runner.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use pipeflow::driver::Driver;
use pipeflow::engine::{Engine, EngineOptions};
use pipeflow::errors::PipeflowError;
use pipeflow::params::{DefaultsOnly, ParameterSource, Parameters, StaticParameters, render_script};
use pipeflow::store::GraphStore;
use pipeflow::types::{PipelineState, TrackState};
use pipeflow_test_utils::builders::{BuiltGraph, GraphBuilder};
use pipeflow_test_utils::fake_runner::FakeRunner;
use pipeflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const POLL: Duration = Duration::from_millis(20);

fn engine(g: &BuiltGraph, runner: &FakeRunner, workers: usize) -> Engine {
    Engine::start(
        g.store.clone(),
        Arc::new(runner.clone()),
        EngineOptions { workers },
    )
}

fn driver(g: &BuiltGraph, source: impl ParameterSource + 'static) -> Driver {
    Driver::new(g.store.clone(), Arc::new(source), POLL)
}

#[tokio::test]
async fn chain_runs_in_dependency_order() -> TestResult {
    init_tracing();
    let g = GraphBuilder::new("chain").chain(&["A", "B", "C"]).build();
    let p = g.start("p");
    let runner = FakeRunner::new();
    let engine = engine(&g, &runner, 3);

    let state = with_timeout(driver(&g, DefaultsOnly).run_pipeline(&engine, p.id)).await?;
    engine.shutdown().await;

    assert_eq!(state, PipelineState::Finish);
    assert_eq!(runner.executed(), vec!["echo A", "echo B", "echo C"]);
    for name in ["A", "B", "C"] {
        let track = g.track(p.id, name);
        assert_eq!(track.state, TrackState::Succeed);
        assert_eq!(track.output.as_deref(), Some(&*format!("ran: echo {name}\n")));
    }
    Ok(())
}

#[tokio::test]
async fn failing_step_fails_pipeline_and_stops_downstream() -> TestResult {
    init_tracing();
    let g = GraphBuilder::new("chain")
        .chain(&["A", "B", "C", "D"])
        .build();
    let p = g.start("p");
    let runner = FakeRunner::new().exit_with("echo B", 1);
    let engine = engine(&g, &runner, 3);

    let state = with_timeout(driver(&g, DefaultsOnly).run_pipeline(&engine, p.id)).await?;
    engine.shutdown().await;

    assert_eq!(state, PipelineState::Failed);
    assert_eq!(runner.executed(), vec!["echo A", "echo B"]);
    assert_eq!(g.track(p.id, "A").state, TrackState::Succeed);
    assert_eq!(g.track(p.id, "B").state, TrackState::Failed);
    assert_eq!(g.track(p.id, "C").state, TrackState::Waiting);
    assert_eq!(g.track(p.id, "D").state, TrackState::Waiting);
    Ok(())
}

#[tokio::test]
async fn pool_never_exceeds_worker_count() -> TestResult {
    init_tracing();
    let mut builder = GraphBuilder::new("fan-out").vertex("root", "echo root");
    for i in 0..6 {
        let name = format!("leaf{i}");
        builder = builder.vertex(&name, &format!("echo {name}")).edge("root", &name);
    }
    let g = builder.build();
    let p = g.start("p");

    let runner = FakeRunner::new().with_delay(Duration::from_millis(50));
    let engine = engine(&g, &runner, 2);

    let state = with_timeout(driver(&g, DefaultsOnly).run_pipeline(&engine, p.id)).await?;
    engine.shutdown().await;

    assert_eq!(state, PipelineState::Finish);
    assert_eq!(runner.executed().len(), 7);
    assert!(runner.peak_concurrency() <= 2, "peak was {}", runner.peak_concurrency());
    assert_eq!(runner.peak_concurrency(), 2);
    Ok(())
}

#[tokio::test]
async fn diamond_join_runs_exactly_once() -> TestResult {
    init_tracing();
    for round in 0..20 {
        let g = GraphBuilder::new("diamond")
            .vertex("A", "echo A")
            .vertex("B", "echo B")
            .vertex("C", "echo C")
            .vertex("D", "echo D")
            .edge("A", "B")
            .edge("A", "C")
            .edge("B", "D")
            .edge("C", "D")
            .build();
        let p = g.start(&format!("diamond-{round}"));
        let runner = FakeRunner::new().with_delay(Duration::from_millis(5));
        let engine = engine(&g, &runner, 3);

        let state = with_timeout(driver(&g, DefaultsOnly).run_pipeline(&engine, p.id)).await?;
        engine.shutdown().await;

        assert_eq!(state, PipelineState::Finish);
        let executed = runner.executed();
        assert_eq!(executed.len(), 4, "round {round}: {executed:?}");
        assert_eq!(executed.iter().filter(|s| *s == "echo D").count(), 1);
        assert_eq!(executed.first().map(String::as_str), Some("echo A"));
        assert_eq!(executed.last().map(String::as_str), Some("echo D"));
    }
    Ok(())
}

#[tokio::test]
async fn panicking_runner_fails_the_track() -> TestResult {
    init_tracing();
    let g = GraphBuilder::new("chain").chain(&["A", "B"]).build();
    let p = g.start("p");
    let runner = FakeRunner::new().panic_on("echo A");
    let engine = engine(&g, &runner, 1);

    let state = with_timeout(driver(&g, DefaultsOnly).run_pipeline(&engine, p.id)).await?;
    engine.shutdown().await;

    assert_eq!(state, PipelineState::Failed);
    assert_eq!(g.track(p.id, "A").state, TrackState::Failed);
    assert_eq!(g.track(p.id, "B").state, TrackState::Waiting);
    Ok(())
}

#[tokio::test]
async fn submit_rejects_tracks_that_are_not_ready() -> TestResult {
    init_tracing();
    let g = GraphBuilder::new("chain").chain(&["A", "B"]).build();
    let p = g.start("p");
    let runner = FakeRunner::new();
    let engine = engine(&g, &runner, 1);

    let a = g.track(p.id, "A");
    let b = g.track(p.id, "B");

    // WAITING track
    match engine.submit(b.id) {
        Err(PipeflowError::TrackNotPending { track, state }) => {
            assert_eq!(track, b.id);
            assert_eq!(state, TrackState::Waiting);
        }
        other => panic!("expected TrackNotPending, got {other:?}"),
    }

    // PENDING but not rendered
    assert!(matches!(
        engine.submit(a.id),
        Err(PipeflowError::MissingScript(id)) if id == a.id
    ));
    assert_eq!(g.track(p.id, "A").state, TrackState::Pending);
    assert_eq!(g.track(p.id, "B").state, TrackState::Waiting);

    render_script(g.store.as_ref(), a.id, Some(r#"{"script": "echo A"}"#), &Parameters::new())?;
    engine.submit(a.id)?;

    // RUNNING (or already finished) track cannot be submitted twice
    assert!(matches!(
        engine.submit(a.id),
        Err(PipeflowError::TrackNotPending { .. })
    ));

    engine.shutdown().await;
    assert_eq!(runner.executed(), vec!["echo A"]);
    assert_eq!(g.track(p.id, "A").state, TrackState::Succeed);
    assert_eq!(g.track(p.id, "B").state, TrackState::Pending);
    Ok(())
}

#[tokio::test]
async fn supplied_parameters_are_rendered_and_recorded() -> TestResult {
    init_tracing();
    let g = GraphBuilder::new("params")
        .vertex_with_input(
            "ping",
            "ping {ip} -c {count}",
            Some(r#"{"ip": {"type": "string", "default": "127.0.0.1"},
                     "count": {"type": "int", "default": 2}}"#),
        )
        .vertex_with_input(
            "report",
            "echo {ip}",
            Some(r#"{"ip": {"type": "str", "default": "127.0.0.1"}}"#),
        )
        .edge("ping", "report")
        .build();
    let p = g.start("p");
    let runner = FakeRunner::new();
    let engine = engine(&g, &runner, 2);

    let source = StaticParameters::new()
        .set("ip", "10.0.0.1")
        .set_for("report", "ip", "10.0.0.2");
    let state = with_timeout(driver(&g, source).run_pipeline(&engine, p.id)).await?;
    engine.shutdown().await;

    assert_eq!(state, PipelineState::Finish);
    assert_eq!(runner.executed(), vec!["ping 10.0.0.1 -c 2", "echo 10.0.0.2"]);

    let ping = g.track(p.id, "ping");
    assert_eq!(ping.script.as_deref(), Some("ping 10.0.0.1 -c 2"));
    let input: serde_json::Value = serde_json::from_str(ping.input.as_deref().unwrap_or("{}"))?;
    assert_eq!(input["ip"], "10.0.0.1");
    assert_eq!(input["count"], 2);
    Ok(())
}

#[tokio::test]
async fn unresolvable_parameter_leaves_track_pending() -> TestResult {
    init_tracing();
    let g = GraphBuilder::new("params")
        .vertex_with_input(
            "A",
            "echo {port}",
            Some(r#"{"port": {"type": "integer", "required": true}}"#),
        )
        .vertex("B", "echo B")
        .edge("A", "B")
        .build();
    let p = g.start("p");
    let runner = FakeRunner::new();
    let engine = engine(&g, &runner, 1);

    let source = StaticParameters::new().set("port", "eighty");
    let outcome = with_timeout(driver(&g, source).run_pipeline(&engine, p.id)).await;
    engine.shutdown().await;

    assert!(matches!(outcome, Err(PipeflowError::ParameterTypeError(_))));
    let a = g.track(p.id, "A");
    assert_eq!(a.state, TrackState::Pending);
    assert!(a.script.is_none());
    assert!(runner.executed().is_empty());
    assert_eq!(g.store.pipeline(p.id)?.state, PipelineState::Running);
    Ok(())
}

#[tokio::test]
async fn progress_signal_fires_after_each_result() -> TestResult {
    init_tracing();
    let g = GraphBuilder::new("chain").chain(&["A", "B"]).build();
    let p = g.start("p");
    let runner = FakeRunner::new();
    let engine = engine(&g, &runner, 1);
    let progress = engine.progress();

    let a = g.track(p.id, "A");
    render_script(g.store.as_ref(), a.id, Some(r#"{"script": "echo A"}"#), &Parameters::new())?;
    engine.submit(a.id)?;
    with_timeout(progress.notified()).await;

    assert_eq!(g.track(p.id, "A").state, TrackState::Succeed);
    assert_eq!(g.track(p.id, "B").state, TrackState::Pending);
    engine.shutdown().await;
    Ok(())
}
