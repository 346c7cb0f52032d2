//! Creating pipeline runs from validated graphs.

use std::collections::HashSet;

use tracing::info;

use crate::errors::{PipeflowError, Result};
use crate::store::{GraphStore, NewPipeline, NewTrack, Pipeline, Write, WriteBatch};
use crate::types::{GraphId, TrackState, VertexId};

/// Create a pipeline with one track per vertex of `graph`.
///
/// Entry vertices (zero in-degree) start `PENDING`, all others `WAITING`.
/// The graph is sealed in the same atomic write, so either the pipeline,
/// all its tracks and the seal exist afterwards, or none of them do.
pub fn start_pipeline(
    store: &dyn GraphStore,
    graph: GraphId,
    name: &str,
    desc: Option<&str>,
) -> Result<Pipeline> {
    let record = store.graph(graph)?;
    if !record.validated {
        return Err(PipeflowError::GraphNotValidated(graph));
    }

    let entries: HashSet<VertexId> = store
        .entry_vertices(graph)?
        .into_iter()
        .map(|v| v.id)
        .collect();

    let tracks: Vec<NewTrack> = store
        .vertices(graph)?
        .into_iter()
        .map(|v| NewTrack {
            vertex_id: v.id,
            state: if entries.contains(&v.id) {
                TrackState::Pending
            } else {
                TrackState::Waiting
            },
        })
        .collect();

    let mut batch = WriteBatch::new();
    if !record.sealed {
        batch.push(Write::SealGraph(graph));
    }

    let pipeline = store.insert_pipeline(
        NewPipeline {
            graph_id: graph,
            name: name.to_string(),
            desc: desc.map(str::to_string),
        },
        &tracks,
        batch,
    )?;

    info!(
        pipeline = pipeline.id,
        graph,
        tracks = tracks.len(),
        entries = entries.len(),
        "pipeline started"
    );

    Ok(pipeline)
}
