// src/engine/propagate.rs

//! Recording a finished track and propagating its outcome.
//!
//! [`plan_result`] is pure: given snapshots of the pipeline, its tracks and
//! the graph, it computes every write that one result implies.
//! [`record_result`] loads those snapshots from the store and commits the
//! writes as one batch. Only the engine's persister calls it, one result at
//! a time, so two sibling completions can never both miss (or both perform)
//! a downstream promotion.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::engine::TrackResult;
use crate::errors::Result;
use crate::store::{GraphStore, Pipeline, StoreError, Track, Write, WriteBatch};
use crate::types::{PipelineState, TrackId, TrackState, VertexId};

/// What one recorded result changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Propagation {
    pub track: TrackId,
    /// `SUCCEED` or `FAILED`.
    pub track_state: TrackState,
    /// New pipeline state, if this result changed it.
    pub pipeline_state: Option<PipelineState>,
    /// Tracks moved from `WAITING` to `PENDING`.
    pub promoted: Vec<TrackId>,
}

/// Compute the writes implied by `result`.
///
/// `tracks` must contain every track of `pipeline`, including the one the
/// result belongs to (still `RUNNING`).
pub fn plan_result(
    result: &TrackResult,
    pipeline: &Pipeline,
    tracks: &[Track],
    graph: &DagGraph,
) -> Result<(WriteBatch, Propagation)> {
    let track = tracks
        .iter()
        .find(|t| t.id == result.track)
        .ok_or_else(|| StoreError::not_found("track", result.track))?;

    let track_state = if result.exit_status == 0 {
        TrackState::Succeed
    } else {
        TrackState::Failed
    };

    let mut batch = WriteBatch::new()
        .with(Write::SetTrackOutput {
            track: track.id,
            output: result.output.clone(),
        })
        .with(Write::TransitionTrack {
            track: track.id,
            from: TrackState::Running,
            to: track_state,
        });

    let mut step = Propagation {
        track: track.id,
        track_state,
        pipeline_state: None,
        promoted: Vec::new(),
    };

    if pipeline.state.is_terminal() {
        debug!(
            track = track.id,
            pipeline = pipeline.id,
            state = %pipeline.state,
            "pipeline already terminal; recording output only"
        );
        return Ok((batch, step));
    }

    if track_state == TrackState::Failed {
        warn!(
            track = track.id,
            vertex = track.vertex_id,
            pipeline = pipeline.id,
            exit_status = result.exit_status,
            "track failed; failing pipeline"
        );
        fail_pipeline(&mut batch, &mut step, pipeline);
        return Ok((batch, step));
    }

    if tracks
        .iter()
        .any(|t| t.id != track.id && t.state == TrackState::Failed)
    {
        info!(pipeline = pipeline.id, "pipeline already has a failed track");
        fail_pipeline(&mut batch, &mut step, pipeline);
        return Ok((batch, step));
    }

    // vertex -> (track, state) with this result applied
    let mut states: HashMap<VertexId, (TrackId, TrackState)> = tracks
        .iter()
        .map(|t| (t.vertex_id, (t.id, t.state)))
        .collect();
    states.insert(track.vertex_id, (track.id, track_state));

    let succeeded = |states: &HashMap<VertexId, (TrackId, TrackState)>, v: &VertexId| {
        matches!(states.get(v), Some((_, TrackState::Succeed)))
    };

    for next in graph.successors(track.vertex_id) {
        let Some(&(next_track, next_state)) = states.get(&next) else {
            warn!(vertex = next, pipeline = pipeline.id, "downstream vertex has no track");
            continue;
        };
        if next_state != TrackState::Waiting {
            continue;
        }

        let upstream = graph.predecessors(next);
        if upstream.iter().all(|v| succeeded(&states, v)) {
            info!(
                track = next_track,
                vertex = next,
                pipeline = pipeline.id,
                "all predecessors succeeded; promoting to PENDING"
            );
            batch.push(Write::TransitionTrack {
                track: next_track,
                from: TrackState::Waiting,
                to: TrackState::Pending,
            });
            states.insert(next, (next_track, TrackState::Pending));
            step.promoted.push(next_track);
        } else {
            debug!(
                vertex = next,
                pipeline = pipeline.id,
                "downstream vertex still has unfinished predecessors"
            );
        }
    }

    let complete = graph.sinks().into_iter().all(|sink| {
        graph
            .predecessor_closure(sink)
            .iter()
            .all(|v| succeeded(&states, v))
    });

    if complete {
        info!(
            pipeline = pipeline.id,
            last = track.vertex_id,
            "every track succeeded; pipeline finished"
        );
        batch.push(Write::SetPipelineState {
            pipeline: pipeline.id,
            state: PipelineState::Finish,
        });
        step.pipeline_state = Some(PipelineState::Finish);
    }

    Ok((batch, step))
}

fn fail_pipeline(batch: &mut WriteBatch, step: &mut Propagation, pipeline: &Pipeline) {
    batch.push(Write::SetPipelineState {
        pipeline: pipeline.id,
        state: PipelineState::Failed,
    });
    step.pipeline_state = Some(PipelineState::Failed);
}

/// Persist `result` and its consequences in one atomic write.
pub fn record_result(store: &dyn GraphStore, result: &TrackResult) -> Result<Propagation> {
    let track = store.track(result.track)?;
    let pipeline = store.pipeline(track.pipeline_id)?;
    let tracks = store.tracks(pipeline.id, &[])?;
    let graph = DagGraph::load(store, pipeline.graph_id)?;

    let (batch, step) = plan_result(result, &pipeline, &tracks, &graph)?;
    store.apply(batch)?;
    Ok(step)
}
