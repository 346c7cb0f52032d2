// src/view.rs

//! Read-only node/link view of a pipeline, as rendered by a visualizer.

use std::collections::HashMap;

use serde::Serialize;

use crate::errors::Result;
use crate::params::extract_template;
use crate::store::GraphStore;
use crate::types::{PipelineId, PipelineState, TrackState, VertexId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineView {
    pub title: String,
    pub state: PipelineState,
    pub nodes: Vec<ViewNode>,
    pub links: Vec<ViewLink>,
}

/// One vertex; `value` is the rendered script once the track is prepared,
/// the template before that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewNode {
    pub name: String,
    pub value: String,
    pub state: Option<TrackState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewLink {
    pub source: String,
    pub target: String,
}

pub fn pipeline_view(store: &dyn GraphStore, pipeline: PipelineId) -> Result<PipelineView> {
    let pipeline = store.pipeline(pipeline)?;
    let vertices = store.vertices(pipeline.graph_id)?;
    let tracks: HashMap<VertexId, _> = store
        .tracks(pipeline.id, &[])?
        .into_iter()
        .map(|t| (t.vertex_id, t))
        .collect();

    let names: HashMap<VertexId, &str> = vertices.iter().map(|v| (v.id, v.name.as_str())).collect();

    let nodes = vertices
        .iter()
        .map(|vertex| {
            let track = tracks.get(&vertex.id);
            let value = match track.and_then(|t| t.script.clone()) {
                Some(script) => script,
                None => extract_template(vertex.script.as_deref()),
            };
            ViewNode {
                name: vertex.name.clone(),
                value,
                state: track.map(|t| t.state),
            }
        })
        .collect();

    let links = store
        .edges(pipeline.graph_id)?
        .iter()
        .filter_map(|e| {
            Some(ViewLink {
                source: names.get(&e.tail)?.to_string(),
                target: names.get(&e.head)?.to_string(),
            })
        })
        .collect();

    Ok(PipelineView {
        title: pipeline.name,
        state: pipeline.state,
        nodes,
        links,
    })
}
