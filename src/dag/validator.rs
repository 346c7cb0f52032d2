// src/dag/validator.rs

//! Acyclicity check for stored graphs.
//!
//! The check peels the graph layer by layer (Kahn's algorithm): every round
//! removes the outgoing edges of vertices that no remaining edge points at.
//! If edges remain but every vertex still has an incoming edge, the rest of
//! the graph is a cycle (or feeds one).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::errors::{PipeflowError, Result};
use crate::store::{GraphStore, StoreError, Write, WriteBatch};
use crate::types::{GraphId, VertexId};

/// Decide whether `(vertices, edges)` is a usable DAG.
///
/// Graphs without vertices or without edges are rejected: a pipeline must
/// express at least one dependency. Edges that reference a vertex outside
/// `vertices` also make the graph invalid.
pub fn validate(vertices: &[VertexId], edges: &[(VertexId, VertexId)]) -> bool {
    peel(vertices, edges).is_ok()
}

/// Run the layer peeling. On failure returns the vertices left unresolved.
fn peel(
    vertices: &[VertexId],
    edges: &[(VertexId, VertexId)],
) -> std::result::Result<(), Vec<VertexId>> {
    if vertices.is_empty() || edges.is_empty() {
        return Err(Vec::new());
    }

    let mut remaining: HashSet<VertexId> = vertices.iter().copied().collect();

    if let Some((tail, head)) = edges
        .iter()
        .find(|(t, h)| !remaining.contains(t) || !remaining.contains(h))
    {
        debug!(tail, head, "edge references a vertex outside the graph");
        return Err(Vec::new());
    }

    // tail -> outgoing edges
    let mut adjacency: HashMap<VertexId, Vec<(VertexId, VertexId)>> = HashMap::new();
    let mut has_incoming: HashSet<VertexId> = HashSet::new();
    for &(tail, head) in edges {
        adjacency.entry(tail).or_default().push((tail, head));
        has_incoming.insert(head);
    }

    while !adjacency.is_empty() {
        let roots: Vec<VertexId> = remaining.difference(&has_incoming).copied().collect();
        if roots.is_empty() {
            let mut stuck: Vec<VertexId> = remaining.into_iter().collect();
            stuck.sort_unstable();
            return Err(stuck);
        }

        for root in &roots {
            adjacency.remove(root);
        }

        remaining = has_incoming;
        has_incoming = adjacency
            .values()
            .flat_map(|out| out.iter().map(|&(_, head)| head))
            .collect();
    }

    Ok(())
}

/// Durable validation on top of a [`GraphStore`].
///
/// Keeps one lock per graph so concurrent validations of the same graph
/// serialize and the `validated` flag has a single writer. A graph's lock is
/// dropped once the graph is validated; later calls see the flag and return
/// early.
pub struct GraphValidator {
    store: Arc<dyn GraphStore>,
    locks: Mutex<HashMap<GraphId, Arc<Mutex<()>>>>,
}

impl GraphValidator {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, graph: GraphId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| PipeflowError::PersistenceFailure(StoreError::LockPoisoned))?;
        Ok(Arc::clone(locks.entry(graph).or_default()))
    }

    fn release(&self, graph: GraphId) -> Result<()> {
        self.locks
            .lock()
            .map_err(|_| PipeflowError::PersistenceFailure(StoreError::LockPoisoned))?
            .remove(&graph);
        Ok(())
    }

    /// Validate `graph` and persist the verdict.
    ///
    /// Already validated graphs return `true` without being re-checked.
    pub fn validate_graph(&self, graph: GraphId) -> Result<bool> {
        let lock = self.lock_for(graph)?;
        let _guard = lock
            .lock()
            .map_err(|_| PipeflowError::PersistenceFailure(StoreError::LockPoisoned))?;

        let record = self.store.graph(graph)?;
        if record.validated {
            debug!(graph, "graph already validated; skipping");
            self.release(graph)?;
            return Ok(true);
        }

        let vertices: Vec<VertexId> = self.store.vertices(graph)?.iter().map(|v| v.id).collect();
        let edges: Vec<(VertexId, VertexId)> = self
            .store
            .edges(graph)?
            .iter()
            .map(|e| (e.tail, e.head))
            .collect();

        match peel(&vertices, &edges) {
            Ok(()) => {
                self.store
                    .apply(WriteBatch::new().with(Write::MarkGraphValidated(graph)))?;
                info!(graph, name = %record.name, "graph validated as DAG");
                self.release(graph)?;
                Ok(true)
            }
            Err(stuck) if stuck.is_empty() => {
                warn!(
                    graph,
                    name = %record.name,
                    vertices = vertices.len(),
                    edges = edges.len(),
                    "graph rejected: needs vertices and at least one valid edge"
                );
                Ok(false)
            }
            Err(stuck) => {
                warn!(graph, name = %record.name, ?stuck, "graph rejected: cycle detected");
                Ok(false)
            }
        }
    }

    /// Like [`validate_graph`](Self::validate_graph) but turns a rejection
    /// into [`PipeflowError::CycleDetected`] naming the offending vertices.
    pub fn ensure_valid(&self, graph: GraphId) -> Result<()> {
        if self.validate_graph(graph)? {
            return Ok(());
        }

        let vertices = self.store.vertices(graph)?;
        let edges: Vec<(VertexId, VertexId)> = self
            .store
            .edges(graph)?
            .iter()
            .map(|e| (e.tail, e.head))
            .collect();
        let ids: Vec<VertexId> = vertices.iter().map(|v| v.id).collect();

        let detail = match peel(&ids, &edges) {
            Err(stuck) if !stuck.is_empty() => {
                let names: Vec<&str> = vertices
                    .iter()
                    .filter(|v| stuck.contains(&v.id))
                    .map(|v| v.name.as_str())
                    .collect();
                format!("unresolved vertices {:?}", names)
            }
            _ => "graph has no vertices or no edges".to_string(),
        };

        Err(PipeflowError::CycleDetected(detail))
    }

    /// Validate every graph whose `validated` flag is still false.
    ///
    /// Returns `(graph, verdict)` pairs in id order.
    pub fn validate_all(&self) -> Result<Vec<(GraphId, bool)>> {
        let mut verdicts = Vec::new();
        for graph in self.store.graphs()?.into_iter().filter(|g| !g.validated) {
            let ok = self.validate_graph(graph.id)?;
            info!(graph = graph.id, name = %graph.name, valid = ok, "startup DAG check");
            verdicts.push((graph.id, ok));
        }
        Ok(verdicts)
    }
}
