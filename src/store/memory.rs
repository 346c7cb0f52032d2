//! In-memory implementation of [`GraphStore`].
//!
//! All tables live behind a single `Mutex`, so every call is trivially
//! isolated from every other call. Batches are checked in full before the
//! first write is applied, which makes them all-or-nothing.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::store::error::{Result, StoreError};
use crate::store::{
    Edge, Graph, GraphStore, NewPipeline, NewTrack, Pipeline, Track, Vertex, Write, WriteBatch,
};
use crate::types::{GraphId, PipelineId, PipelineState, TrackId, TrackState, VertexId};

#[derive(Debug, Default)]
struct Tables {
    graphs: BTreeMap<GraphId, Graph>,
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<u64, Edge>,
    pipelines: BTreeMap<PipelineId, Pipeline>,
    tracks: BTreeMap<TrackId, Track>,
    /// Last id handed out per table (auto-increment, starting at 1).
    seq: Sequences,
}

#[derive(Debug, Default)]
struct Sequences {
    graph: u64,
    vertex: u64,
    edge: u64,
    pipeline: u64,
    track: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn graph(&self, id: GraphId) -> Result<&Graph> {
        self.graphs
            .get(&id)
            .ok_or_else(|| StoreError::not_found("graph", id))
    }

    fn unsealed_graph(&self, id: GraphId) -> Result<&Graph> {
        let graph = self.graph(id)?;
        if graph.sealed {
            return Err(StoreError::GraphSealed(id));
        }
        Ok(graph)
    }

    fn vertex_in(&self, graph: GraphId, vertex: VertexId) -> Result<&Vertex> {
        let v = self
            .vertices
            .get(&vertex)
            .ok_or_else(|| StoreError::not_found("vertex", vertex))?;
        if v.graph_id != graph {
            return Err(StoreError::ForeignVertex { graph, vertex });
        }
        Ok(v)
    }

    /// Check that every write targets an existing record.
    fn check(&self, write: &Write) -> Result<()> {
        match write {
            Write::MarkGraphValidated(id) | Write::SealGraph(id) => self.graph(*id).map(|_| ()),
            Write::SetPipelineState { pipeline, .. } => {
                if self.pipelines.contains_key(pipeline) {
                    Ok(())
                } else {
                    Err(StoreError::not_found("pipeline", *pipeline))
                }
            }
            Write::TransitionTrack { track, from, .. } => match self.tracks.get(track) {
                Some(t) if t.state == *from => Ok(()),
                Some(t) => Err(StoreError::StateConflict {
                    track: *track,
                    expected: *from,
                    actual: t.state,
                }),
                None => Err(StoreError::not_found("track", *track)),
            },
            Write::SetTrackPrepared { track, .. }
            | Write::SetTrackOutput { track, .. } => {
                if self.tracks.contains_key(track) {
                    Ok(())
                } else {
                    Err(StoreError::not_found("track", *track))
                }
            }
        }
    }

    /// Apply a write that already passed [`Tables::check`].
    fn apply(&mut self, write: Write) {
        match write {
            Write::MarkGraphValidated(id) => {
                if let Some(g) = self.graphs.get_mut(&id) {
                    g.validated = true;
                }
            }
            Write::SealGraph(id) => {
                if let Some(g) = self.graphs.get_mut(&id) {
                    g.sealed = true;
                }
            }
            Write::SetPipelineState { pipeline, state } => {
                if let Some(p) = self.pipelines.get_mut(&pipeline) {
                    p.state = state;
                }
            }
            Write::TransitionTrack { track, to, .. } => {
                if let Some(t) = self.tracks.get_mut(&track) {
                    t.state = to;
                }
            }
            Write::SetTrackPrepared {
                track,
                input,
                script,
            } => {
                if let Some(t) = self.tracks.get_mut(&track) {
                    t.input = Some(input);
                    t.script = Some(script);
                }
            }
            Write::SetTrackOutput { track, output } => {
                if let Some(t) = self.tracks.get_mut(&track) {
                    t.output = Some(output);
                }
            }
        }
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        for write in batch.writes() {
            self.check(write)?;
        }
        for write in batch {
            self.apply(write);
        }
        Ok(())
    }
}

/// Process-local [`GraphStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl GraphStore for MemoryStore {
    fn create_graph(&self, name: &str, desc: Option<&str>) -> Result<Graph> {
        let mut t = self.lock()?;
        let graph = Graph {
            id: next(&mut t.seq.graph),
            name: name.to_string(),
            desc: desc.map(str::to_string),
            validated: false,
            sealed: false,
        };
        t.graphs.insert(graph.id, graph.clone());
        debug!(graph = graph.id, name = %graph.name, "created graph");
        Ok(graph)
    }

    fn add_vertex(
        &self,
        graph: GraphId,
        name: &str,
        input: Option<&str>,
        script: Option<&str>,
    ) -> Result<Vertex> {
        let mut t = self.lock()?;
        t.unsealed_graph(graph)?;

        if t
            .vertices
            .values()
            .any(|v| v.graph_id == graph && v.name == name)
        {
            return Err(StoreError::DuplicateVertex {
                graph,
                name: name.to_string(),
            });
        }

        let vertex = Vertex {
            id: next(&mut t.seq.vertex),
            graph_id: graph,
            name: name.to_string(),
            input: input.map(str::to_string),
            script: script.map(str::to_string),
        };
        t.vertices.insert(vertex.id, vertex.clone());
        Ok(vertex)
    }

    fn add_edge(&self, graph: GraphId, tail: VertexId, head: VertexId) -> Result<Edge> {
        let mut t = self.lock()?;
        t.unsealed_graph(graph)?;
        if tail == head {
            return Err(StoreError::SelfLoop(tail));
        }
        t.vertex_in(graph, tail)?;
        t.vertex_in(graph, head)?;

        let edge = Edge {
            id: next(&mut t.seq.edge),
            graph_id: graph,
            tail,
            head,
        };
        t.edges.insert(edge.id, edge);
        Ok(edge)
    }

    fn delete_vertex(&self, vertex: VertexId) -> Result<Option<Vertex>> {
        let mut t = self.lock()?;
        let graph = match t.vertices.get(&vertex) {
            Some(v) => v.graph_id,
            None => return Ok(None),
        };
        t.unsealed_graph(graph)?;

        t.edges.retain(|_, e| e.tail != vertex && e.head != vertex);
        Ok(t.vertices.remove(&vertex))
    }

    fn graph(&self, id: GraphId) -> Result<Graph> {
        self.lock()?.graph(id).cloned()
    }

    fn graphs(&self) -> Result<Vec<Graph>> {
        Ok(self.lock()?.graphs.values().cloned().collect())
    }

    fn vertex(&self, id: VertexId) -> Result<Vertex> {
        self.lock()?
            .vertices
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("vertex", id))
    }

    fn vertices(&self, graph: GraphId) -> Result<Vec<Vertex>> {
        let t = self.lock()?;
        t.graph(graph)?;
        Ok(t.vertices
            .values()
            .filter(|v| v.graph_id == graph)
            .cloned()
            .collect())
    }

    fn edges(&self, graph: GraphId) -> Result<Vec<Edge>> {
        let t = self.lock()?;
        t.graph(graph)?;
        Ok(t.edges
            .values()
            .filter(|e| e.graph_id == graph)
            .copied()
            .collect())
    }

    fn entry_vertices(&self, graph: GraphId) -> Result<Vec<Vertex>> {
        let t = self.lock()?;
        t.graph(graph)?;
        let heads: HashSet<VertexId> = t
            .edges
            .values()
            .filter(|e| e.graph_id == graph)
            .map(|e| e.head)
            .collect();
        Ok(t.vertices
            .values()
            .filter(|v| v.graph_id == graph && !heads.contains(&v.id))
            .cloned()
            .collect())
    }

    fn pipeline(&self, id: PipelineId) -> Result<Pipeline> {
        self.lock()?
            .pipelines
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("pipeline", id))
    }

    fn track(&self, id: TrackId) -> Result<Track> {
        self.lock()?
            .tracks
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("track", id))
    }

    fn tracks(&self, pipeline: PipelineId, states: &[TrackState]) -> Result<Vec<Track>> {
        let t = self.lock()?;
        if !t.pipelines.contains_key(&pipeline) {
            return Err(StoreError::not_found("pipeline", pipeline));
        }
        Ok(t.tracks
            .values()
            .filter(|tr| tr.pipeline_id == pipeline)
            .filter(|tr| states.is_empty() || states.contains(&tr.state))
            .cloned()
            .collect())
    }

    fn insert_pipeline(
        &self,
        pipeline: NewPipeline,
        tracks: &[NewTrack],
        batch: WriteBatch,
    ) -> Result<Pipeline> {
        let mut t = self.lock()?;
        t.graph(pipeline.graph_id)?;
        for nt in tracks {
            t.vertex_in(pipeline.graph_id, nt.vertex_id)?;
        }
        for write in batch.writes() {
            t.check(write)?;
        }

        let record = Pipeline {
            id: next(&mut t.seq.pipeline),
            graph_id: pipeline.graph_id,
            name: pipeline.name,
            desc: pipeline.desc,
            state: PipelineState::Running,
        };
        t.pipelines.insert(record.id, record.clone());

        for nt in tracks {
            let track = Track {
                id: next(&mut t.seq.track),
                pipeline_id: record.id,
                vertex_id: nt.vertex_id,
                state: nt.state,
                input: None,
                script: None,
                output: None,
            };
            t.tracks.insert(track.id, track);
        }

        for write in batch {
            t.apply(write);
        }

        Ok(record)
    }

    fn apply(&self, batch: WriteBatch) -> Result<()> {
        self.lock()?.commit(batch)
    }
}
