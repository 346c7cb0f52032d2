// src/engine/runtime.rs

use std::sync::Arc;

use tokio::sync::{Notify, Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::engine::propagate::record_result;
use crate::engine::{EngineOptions, TrackResult};
use crate::errors::{PipeflowError, Result};
use crate::exec::{ScriptOutcome, ScriptRunner};
use crate::store::{GraphStore, StoreError, Write, WriteBatch};
use crate::types::{TrackId, TrackState};

/// A track handed to the pool.
#[derive(Debug)]
struct Job {
    track: TrackId,
    script: String,
}

/// Running engine: a collector task owning the pool and a persister task
/// owning every result write.
///
/// Must be started from within a tokio runtime.
pub struct Engine {
    store: Arc<dyn GraphStore>,
    submit_tx: mpsc::UnboundedSender<Job>,
    progress: Arc<Notify>,
    collector: JoinHandle<()>,
    persister: JoinHandle<()>,
}

impl Engine {
    pub fn start(
        store: Arc<dyn GraphStore>,
        runner: Arc<dyn ScriptRunner>,
        options: EngineOptions,
    ) -> Self {
        let workers = options.workers.max(1);
        let (submit_tx, submit_rx) = mpsc::unbounded_channel::<Job>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<TrackResult>();
        let progress = Arc::new(Notify::new());

        let collector = tokio::spawn(collect(
            submit_rx,
            runner,
            Arc::new(Semaphore::new(workers)),
            result_tx,
        ));
        let persister = tokio::spawn(persist(store.clone(), result_rx, progress.clone()));

        info!(workers, "execution engine started");

        Self {
            store,
            submit_tx,
            progress,
            collector,
            persister,
        }
    }

    /// Mark a PENDING track RUNNING and queue its script for execution.
    ///
    /// Returns as soon as the job is queued; the outcome arrives through the
    /// persister.
    pub fn submit(&self, track: TrackId) -> Result<()> {
        let record = self.store.track(track)?;
        if record.state != TrackState::Pending {
            return Err(PipeflowError::TrackNotPending {
                track,
                state: record.state,
            });
        }
        let script = record.script.ok_or(PipeflowError::MissingScript(track))?;

        match self.store.apply(transition(track, TrackState::Pending, TrackState::Running)) {
            Ok(()) => {}
            Err(StoreError::StateConflict { actual, .. }) => {
                return Err(PipeflowError::TrackNotPending {
                    track,
                    state: actual,
                });
            }
            Err(err) => return Err(err.into()),
        }

        if self.submit_tx.send(Job { track, script }).is_err() {
            if let Err(err) =
                self.store
                    .apply(transition(track, TrackState::Running, TrackState::Pending))
            {
                error!(track, error = %err, "failed to put unsubmitted track back to PENDING");
            }
            return Err(PipeflowError::EngineStopped);
        }

        info!(track, pipeline = record.pipeline_id, "track submitted");
        Ok(())
    }

    /// Wait until the persister has processed at least one more result.
    ///
    /// A result processed while nobody was waiting is remembered, so a
    /// notification is never lost between two calls.
    pub async fn notified(&self) {
        self.progress.notified().await;
    }

    /// Handle on the progress signal, for callers that outlive `&self`.
    pub fn progress(&self) -> Arc<Notify> {
        self.progress.clone()
    }

    /// Stop accepting work, wait for in-flight scripts and drain the
    /// persister.
    pub async fn shutdown(self) {
        let Engine {
            submit_tx,
            collector,
            persister,
            ..
        } = self;

        drop(submit_tx);
        if let Err(err) = collector.await {
            error!(error = %err, "collector task ended abnormally");
        }
        if let Err(err) = persister.await {
            error!(error = %err, "persister task ended abnormally");
        }
        info!("execution engine stopped");
    }
}

fn transition(track: TrackId, from: TrackState, to: TrackState) -> WriteBatch {
    WriteBatch::new().with(Write::TransitionTrack { track, from, to })
}

/// Collector loop: accept jobs while the submission side is open, and take
/// every completion exactly once.
async fn collect(
    mut jobs: mpsc::UnboundedReceiver<Job>,
    runner: Arc<dyn ScriptRunner>,
    permits: Arc<Semaphore>,
    results: mpsc::UnboundedSender<TrackResult>,
) {
    debug!("collector loop started");
    let mut running: JoinSet<TrackResult> = JoinSet::new();
    let mut accepting = true;

    loop {
        tokio::select! {
            job = jobs.recv(), if accepting => match job {
                Some(job) => {
                    running.spawn(execute(job, runner.clone(), permits.clone()));
                }
                None => {
                    debug!(in_flight = running.len(), "submission closed");
                    accepting = false;
                }
            },
            Some(joined) = running.join_next(), if !running.is_empty() => match joined {
                Ok(result) => {
                    if results.send(result).is_err() {
                        warn!("persister is gone; dropping result");
                    }
                }
                Err(err) => error!(error = %err, "execution task failed to complete"),
            },
            else => break,
        }
    }

    debug!("collector loop finished");
}

/// Run one job under a pool permit.
///
/// The runner executes in its own task so a panicking runner turns into a
/// failed result instead of a track stuck in RUNNING.
async fn execute(job: Job, runner: Arc<dyn ScriptRunner>, permits: Arc<Semaphore>) -> TrackResult {
    let track = job.track;
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(err) => {
            error!(track, error = %err, "worker pool closed");
            return TrackResult {
                track,
                exit_status: -1,
                output: String::new(),
            };
        }
    };

    debug!(track, "executing script");
    let script = job.script;
    let outcome = match tokio::spawn(async move { runner.run(script).await }).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(track, error = %err, "script runner panicked");
            ScriptOutcome {
                exit_status: -1,
                output: String::new(),
            }
        }
    };

    debug!(track, exit_status = outcome.exit_status, "script finished");
    TrackResult {
        track,
        exit_status: outcome.exit_status,
        output: outcome.output,
    }
}

/// Persister loop: the only writer of results and propagation.
async fn persist(
    store: Arc<dyn GraphStore>,
    mut results: mpsc::UnboundedReceiver<TrackResult>,
    progress: Arc<Notify>,
) {
    debug!("persister loop started");

    while let Some(result) = results.recv().await {
        match record_result(store.as_ref(), &result) {
            Ok(step) => {
                info!(
                    track = step.track,
                    state = %step.track_state,
                    exit_status = result.exit_status,
                    promoted = ?step.promoted,
                    "track result recorded"
                );
                if let Some(state) = step.pipeline_state {
                    info!(track = step.track, %state, "pipeline state changed");
                }
            }
            Err(err) => {
                error!(
                    track = result.track,
                    exit_status = result.exit_status,
                    error = %err,
                    "failed to record track result; track stays RUNNING"
                );
            }
        }
        progress.notify_one();
    }

    debug!("persister loop finished");
}
