// src/store/mod.rs

//! Repository-style access to graphs, vertices, edges, pipelines and tracks.
//!
//! The core never talks to a database directly. Everything goes through the
//! [`GraphStore`] trait, whose contract is:
//!
//! - reads return owned snapshots of records;
//! - every mutating call is atomic: callers never observe a partially
//!   applied [`WriteBatch`] or a pipeline without its tracks.
//!
//! [`MemoryStore`] is the bundled implementation used by the CLI and tests.

pub mod error;
pub mod memory;

use serde::Serialize;

use crate::types::{
    EdgeId, GraphId, PipelineId, PipelineState, TrackId, TrackState, VertexId,
};

pub use error::{Result, StoreError};
pub use memory::MemoryStore;

/// A named DAG template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub id: GraphId,
    pub name: String,
    pub desc: Option<String>,
    /// Acyclicity has been confirmed by the validator.
    pub validated: bool,
    /// At least one pipeline was instantiated from this graph.
    pub sealed: bool,
}

/// A named step within a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vertex {
    pub id: VertexId,
    pub graph_id: GraphId,
    pub name: String,
    /// JSON input specification: `{"ip": {"type": "string", "default": "..."}}`.
    pub input: Option<String>,
    /// JSON script definition: `{"script": "echo {ip}"}`.
    pub script: Option<String>,
}

/// Dependency `tail -> head`: head may not start before tail succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub graph_id: GraphId,
    pub tail: VertexId,
    pub head: VertexId,
}

/// One execution instance of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub graph_id: GraphId,
    pub name: String,
    pub desc: Option<String>,
    pub state: PipelineState,
}

/// One vertex's execution record within a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: TrackId,
    pub pipeline_id: PipelineId,
    pub vertex_id: VertexId,
    pub state: TrackState,
    /// Resolved parameters as JSON.
    pub input: Option<String>,
    /// Rendered script.
    pub script: Option<String>,
    /// Captured stdout/stderr of every script line.
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPipeline {
    pub graph_id: GraphId,
    pub name: String,
    pub desc: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewTrack {
    pub vertex_id: VertexId,
    pub state: TrackState,
}

/// A single update to an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    MarkGraphValidated(GraphId),
    SealGraph(GraphId),
    SetPipelineState {
        pipeline: PipelineId,
        state: PipelineState,
    },
    /// Compare-and-set: move `track` to `to` only if it is currently `from`.
    TransitionTrack {
        track: TrackId,
        from: TrackState,
        to: TrackState,
    },
    /// Durable record of what will execute.
    SetTrackPrepared {
        track: TrackId,
        input: String,
        script: String,
    },
    SetTrackOutput {
        track: TrackId,
        output: String,
    },
}

/// Ordered set of writes committed as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub fn with(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }
}

impl IntoIterator for WriteBatch {
    type Item = Write;
    type IntoIter = std::vec::IntoIter<Write>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// Storage contract for the orchestration core.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn GraphStore>`.
pub trait GraphStore: Send + Sync {
    fn create_graph(&self, name: &str, desc: Option<&str>) -> Result<Graph>;

    /// Add a vertex to an unsealed graph.
    fn add_vertex(
        &self,
        graph: GraphId,
        name: &str,
        input: Option<&str>,
        script: Option<&str>,
    ) -> Result<Vertex>;

    /// Add an edge between two vertices of the same unsealed graph.
    ///
    /// Duplicate edges are accepted as-is; self-loops are rejected.
    fn add_edge(&self, graph: GraphId, tail: VertexId, head: VertexId) -> Result<Edge>;

    /// Remove a vertex and every edge touching it.
    ///
    /// Returns `Ok(None)` if the vertex does not exist.
    fn delete_vertex(&self, vertex: VertexId) -> Result<Option<Vertex>>;

    fn graph(&self, id: GraphId) -> Result<Graph>;

    fn graphs(&self) -> Result<Vec<Graph>>;

    fn vertex(&self, id: VertexId) -> Result<Vertex>;

    fn vertices(&self, graph: GraphId) -> Result<Vec<Vertex>>;

    fn edges(&self, graph: GraphId) -> Result<Vec<Edge>>;

    /// Vertices of `graph` that are never the head of an edge.
    fn entry_vertices(&self, graph: GraphId) -> Result<Vec<Vertex>>;

    fn pipeline(&self, id: PipelineId) -> Result<Pipeline>;

    fn track(&self, id: TrackId) -> Result<Track>;

    /// Tracks of `pipeline` whose state is in `states`, ordered by id.
    ///
    /// An empty `states` slice returns every track of the pipeline.
    fn tracks(&self, pipeline: PipelineId, states: &[TrackState]) -> Result<Vec<Track>>;

    /// Insert a pipeline with all of its tracks and apply `batch`, atomically.
    fn insert_pipeline(
        &self,
        pipeline: NewPipeline,
        tracks: &[NewTrack],
        batch: WriteBatch,
    ) -> Result<Pipeline>;

    /// Apply every write in `batch` or none of them.
    fn apply(&self, batch: WriteBatch) -> Result<()>;
}
