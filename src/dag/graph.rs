use std::collections::HashSet;

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};

use crate::store::{self, Edge, GraphStore};
use crate::types::{GraphId, VertexId};

/// Adjacency view of a stored graph keyed by vertex id.
///
/// Duplicate edges collapse into one here; propagation only cares whether a
/// dependency exists, not how many times it was declared.
#[derive(Debug, Clone)]
pub struct DagGraph {
    inner: DiGraphMap<VertexId, ()>,
}

impl DagGraph {
    pub fn from_parts(vertices: impl IntoIterator<Item = VertexId>, edges: &[Edge]) -> Self {
        let mut inner = DiGraphMap::new();
        for v in vertices {
            inner.add_node(v);
        }
        for e in edges {
            inner.add_edge(e.tail, e.head, ());
        }
        Self { inner }
    }

    /// Read vertices and edges of `graph` from the store.
    pub fn load(store: &dyn GraphStore, graph: GraphId) -> store::Result<Self> {
        let vertices = store.vertices(graph)?;
        let edges = store.edges(graph)?;
        Ok(Self::from_parts(vertices.iter().map(|v| v.id), &edges))
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.inner.nodes()
    }

    /// Direct upstream vertices (tails of edges ending at `vertex`).
    pub fn predecessors(&self, vertex: VertexId) -> Vec<VertexId> {
        self.inner
            .neighbors_directed(vertex, Direction::Incoming)
            .collect()
    }

    /// Direct downstream vertices (heads of edges starting at `vertex`).
    pub fn successors(&self, vertex: VertexId) -> Vec<VertexId> {
        self.inner
            .neighbors_directed(vertex, Direction::Outgoing)
            .collect()
    }

    /// Vertices without outgoing edges (isolated vertices included).
    pub fn sinks(&self) -> Vec<VertexId> {
        self.inner
            .nodes()
            .filter(|v| {
                self.inner
                    .neighbors_directed(*v, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// `vertex` plus every vertex it transitively depends on.
    pub fn predecessor_closure(&self, vertex: VertexId) -> HashSet<VertexId> {
        let mut closure = HashSet::new();
        if !self.inner.contains_node(vertex) {
            return closure;
        }

        let reversed = Reversed(&self.inner);
        let mut dfs = Dfs::new(reversed, vertex);
        while let Some(v) = dfs.next(reversed) {
            closure.insert(v);
        }
        closure
    }
}
