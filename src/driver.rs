// src/driver.rs

//! Driver loop: prepares and submits PENDING tracks until the pipeline is
//! terminal.
//!
//! Propagation is event-driven inside the engine; the driver only reacts to
//! it. Each tick it wakes either on the poll interval or as soon as the
//! engine reports a processed result.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::errors::{PipeflowError, Result};
use crate::params::{
    ParameterSource, parse_input_spec, render_script, resolve_parameters, supplied_values,
};
use crate::store::{GraphStore, Track};
use crate::types::{PipelineId, PipelineState, TrackId, TrackState};

pub struct Driver {
    store: Arc<dyn GraphStore>,
    source: Arc<dyn ParameterSource>,
    poll_interval: Duration,
}

/// What one tick achieved.
#[derive(Debug, Default)]
struct Tick {
    submitted: usize,
    /// Tracks that could not be prepared this tick.
    blocked: Vec<TrackId>,
    last_error: Option<PipeflowError>,
}

impl Driver {
    pub fn new(
        store: Arc<dyn GraphStore>,
        source: Arc<dyn ParameterSource>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            source,
            poll_interval,
        }
    }

    /// Drive `pipeline` to FINISH or FAILED and return the final state.
    ///
    /// If nothing is running and every remaining PENDING track fails to
    /// prepare, no further progress is possible; the last preparation error
    /// is returned instead of waiting forever.
    pub async fn run_pipeline(&self, engine: &Engine, pipeline: PipelineId) -> Result<PipelineState> {
        info!(pipeline, "driving pipeline");

        loop {
            let state = self.store.pipeline(pipeline)?.state;
            if state.is_terminal() {
                info!(pipeline, %state, "pipeline reached terminal state");
                return Ok(state);
            }

            let tick = self.tick(engine, pipeline)?;

            if tick.submitted == 0 && self.stalled(pipeline, &tick.blocked)? {
                if let Some(err) = tick.last_error {
                    error!(pipeline, error = %err, "pipeline stalled");
                    return Err(err);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = engine.notified() => {
                    debug!(pipeline, "woken by engine progress");
                }
            }
        }
    }

    fn tick(&self, engine: &Engine, pipeline: PipelineId) -> Result<Tick> {
        let mut tick = Tick::default();

        for track in self.store.tracks(pipeline, &[TrackState::Pending])? {
            if track.script.is_none() {
                match self.prepare(&track) {
                    Ok(()) => {}
                    Err(err @ PipeflowError::ParameterTypeError(_)) => {
                        warn!(
                            track = track.id,
                            vertex = track.vertex_id,
                            error = %err,
                            "cannot resolve parameters; track stays PENDING"
                        );
                        tick.blocked.push(track.id);
                        tick.last_error = Some(err);
                        continue;
                    }
                    Err(err) => return Err(err),
                }
            }

            match engine.submit(track.id) {
                Ok(()) => tick.submitted += 1,
                Err(PipeflowError::TrackNotPending { state, .. }) => {
                    debug!(track = track.id, %state, "track moved on before submission");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(tick)
    }

    /// Nothing is running and every PENDING track is one that just failed
    /// to prepare.
    fn stalled(&self, pipeline: PipelineId, blocked: &[TrackId]) -> Result<bool> {
        if blocked.is_empty() {
            return Ok(false);
        }
        let live = self
            .store
            .tracks(pipeline, &[TrackState::Pending, TrackState::Running])?;
        let state = self.store.pipeline(pipeline)?.state;
        Ok(!state.is_terminal()
            && live
                .iter()
                .all(|t| t.state == TrackState::Pending && blocked.contains(&t.id)))
    }

    /// Resolve parameters and persist the rendered script on `track`.
    fn prepare(&self, track: &Track) -> Result<()> {
        let vertex = self.store.vertex(track.vertex_id)?;
        let spec = parse_input_spec(vertex.input.as_deref())?;
        let supplied = supplied_values(self.source.as_ref(), &vertex, &spec);
        let params = resolve_parameters(&spec, &supplied)?;
        render_script(self.store.as_ref(), track.id, vertex.script.as_deref(), &params)?;
        debug!(track = track.id, vertex = %vertex.name, "track prepared");
        Ok(())
    }
}
