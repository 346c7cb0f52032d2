#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use pipeflow::dag::{GraphValidator, start_pipeline};
use pipeflow::store::{GraphStore, MemoryStore, Pipeline, Track};
use pipeflow::types::{GraphId, PipelineId, VertexId};

/// Builder for a stored graph, to simplify test setup.
///
/// Vertices are named; edges refer to those names.
pub struct GraphBuilder {
    store: Arc<dyn GraphStore>,
    graph: GraphId,
    vertices: HashMap<String, VertexId>,
}

impl GraphBuilder {
    /// Start a graph in a fresh `MemoryStore`.
    pub fn new(name: &str) -> Self {
        Self::on(Arc::new(MemoryStore::new()), name)
    }

    /// Start a graph in an existing store.
    pub fn on(store: Arc<dyn GraphStore>, name: &str) -> Self {
        let graph = store
            .create_graph(name, None)
            .expect("Failed to create graph")
            .id;
        Self {
            store,
            graph,
            vertices: HashMap::new(),
        }
    }

    /// Add a vertex whose script template is `script`.
    pub fn vertex(self, name: &str, script: &str) -> Self {
        self.vertex_with_input(name, script, None)
    }

    /// Add a vertex with a JSON input specification.
    pub fn vertex_with_input(mut self, name: &str, script: &str, input: Option<&str>) -> Self {
        let definition = json!({ "script": script }).to_string();
        let vertex = self
            .store
            .add_vertex(self.graph, name, input, Some(&definition))
            .expect("Failed to add vertex");
        self.vertices.insert(name.to_string(), vertex.id);
        self
    }

    /// Add `tail -> head`: `head` runs after `tail` succeeds.
    pub fn edge(self, tail: &str, head: &str) -> Self {
        let (t, h) = (self.id(tail), self.id(head));
        self.store
            .add_edge(self.graph, t, h)
            .expect("Failed to add edge");
        self
    }

    /// A chain `names[0] -> names[1] -> ...`, each echoing its own name.
    pub fn chain(mut self, names: &[&str]) -> Self {
        for name in names {
            self = self.vertex(name, &format!("echo {name}"));
        }
        for pair in names.windows(2) {
            self = self.edge(pair[0], pair[1]);
        }
        self
    }

    fn id(&self, name: &str) -> VertexId {
        *self
            .vertices
            .get(name)
            .unwrap_or_else(|| panic!("unknown vertex '{name}' in builder"))
    }

    pub fn build(self) -> BuiltGraph {
        BuiltGraph {
            store: self.store,
            graph: self.graph,
            vertices: self.vertices,
        }
    }
}

/// A stored graph plus its name -> id mapping.
pub struct BuiltGraph {
    pub store: Arc<dyn GraphStore>,
    pub graph: GraphId,
    pub vertices: HashMap<String, VertexId>,
}

impl BuiltGraph {
    pub fn vertex(&self, name: &str) -> VertexId {
        *self
            .vertices
            .get(name)
            .unwrap_or_else(|| panic!("unknown vertex '{name}'"))
    }

    /// Validate the graph and instantiate a pipeline from it.
    pub fn start(&self, name: &str) -> Pipeline {
        GraphValidator::new(self.store.clone())
            .ensure_valid(self.graph)
            .expect("Graph should be a valid DAG");
        start_pipeline(self.store.as_ref(), self.graph, name, None)
            .expect("Failed to start pipeline")
    }

    /// The track of vertex `name` in `pipeline`.
    pub fn track(&self, pipeline: PipelineId, name: &str) -> Track {
        let vertex = self.vertex(name);
        self.store
            .tracks(pipeline, &[])
            .expect("Failed to read tracks")
            .into_iter()
            .find(|t| t.vertex_id == vertex)
            .unwrap_or_else(|| panic!("no track for vertex '{name}'"))
    }
}
