use std::sync::{Arc, Mutex};

use pipeflow::store::{
    Edge, Graph, GraphStore, MemoryStore, NewPipeline, NewTrack, Pipeline, Result, StoreError,
    Track, Vertex, Write, WriteBatch,
};
use pipeflow::types::{GraphId, PipelineId, TrackId, TrackState, VertexId};

type BatchFilter = Box<dyn Fn(&WriteBatch) -> bool + Send + Sync>;

/// A `GraphStore` that delegates to a `MemoryStore` but refuses selected
/// batches with `StoreError::Unavailable`.
pub struct FailingStore {
    inner: Arc<dyn GraphStore>,
    filter: Mutex<Option<BatchFilter>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::wrap(Arc::new(MemoryStore::new()))
    }

    pub fn wrap(inner: Arc<dyn GraphStore>) -> Self {
        Self {
            inner,
            filter: Mutex::new(None),
        }
    }

    /// Refuse every batch for which `filter` returns true.
    pub fn fail_batches_where<F>(&self, filter: F)
    where
        F: Fn(&WriteBatch) -> bool + Send + Sync + 'static,
    {
        *self.filter.lock().unwrap() = Some(Box::new(filter));
    }

    /// Refuse batches that record script output (the persister's writes).
    pub fn fail_result_writes(&self) {
        self.fail_batches_where(|batch| {
            batch
                .writes()
                .iter()
                .any(|w| matches!(w, Write::SetTrackOutput { .. }))
        });
    }

    pub fn heal(&self) {
        *self.filter.lock().unwrap() = None;
    }

    fn refuses(&self, batch: &WriteBatch) -> bool {
        self.filter
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|f| f(batch))
    }
}

impl Default for FailingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for FailingStore {
    fn create_graph(&self, name: &str, desc: Option<&str>) -> Result<Graph> {
        self.inner.create_graph(name, desc)
    }

    fn add_vertex(
        &self,
        graph: GraphId,
        name: &str,
        input: Option<&str>,
        script: Option<&str>,
    ) -> Result<Vertex> {
        self.inner.add_vertex(graph, name, input, script)
    }

    fn add_edge(&self, graph: GraphId, tail: VertexId, head: VertexId) -> Result<Edge> {
        self.inner.add_edge(graph, tail, head)
    }

    fn delete_vertex(&self, vertex: VertexId) -> Result<Option<Vertex>> {
        self.inner.delete_vertex(vertex)
    }

    fn graph(&self, id: GraphId) -> Result<Graph> {
        self.inner.graph(id)
    }

    fn graphs(&self) -> Result<Vec<Graph>> {
        self.inner.graphs()
    }

    fn vertex(&self, id: VertexId) -> Result<Vertex> {
        self.inner.vertex(id)
    }

    fn vertices(&self, graph: GraphId) -> Result<Vec<Vertex>> {
        self.inner.vertices(graph)
    }

    fn edges(&self, graph: GraphId) -> Result<Vec<Edge>> {
        self.inner.edges(graph)
    }

    fn entry_vertices(&self, graph: GraphId) -> Result<Vec<Vertex>> {
        self.inner.entry_vertices(graph)
    }

    fn pipeline(&self, id: PipelineId) -> Result<Pipeline> {
        self.inner.pipeline(id)
    }

    fn track(&self, id: TrackId) -> Result<Track> {
        self.inner.track(id)
    }

    fn tracks(&self, pipeline: PipelineId, states: &[TrackState]) -> Result<Vec<Track>> {
        self.inner.tracks(pipeline, states)
    }

    fn insert_pipeline(
        &self,
        pipeline: NewPipeline,
        tracks: &[NewTrack],
        batch: WriteBatch,
    ) -> Result<Pipeline> {
        if self.refuses(&batch) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.insert_pipeline(pipeline, tracks, batch)
    }

    fn apply(&self, batch: WriteBatch) -> Result<()> {
        if self.refuses(&batch) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.apply(batch)
    }
}
