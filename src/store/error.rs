//! Graph store error types.

use thiserror::Error;

use crate::types::{GraphId, TrackId, TrackState, VertexId};

/// Errors produced by [`GraphStore`](crate::store::GraphStore) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{kind} not found: id={id}")]
    NotFound { kind: &'static str, id: u64 },

    /// Vertex names are unique within a graph.
    #[error("graph {graph} already has a vertex named '{name}'")]
    DuplicateVertex { graph: GraphId, name: String },

    #[error("edge from vertex {0} to itself is not allowed")]
    SelfLoop(VertexId),

    /// An edge or track referenced a vertex owned by another graph.
    #[error("vertex {vertex} does not belong to graph {graph}")]
    ForeignVertex { graph: GraphId, vertex: VertexId },

    /// A [`TransitionTrack`](crate::store::Write::TransitionTrack) found the
    /// track in another state than expected.
    #[error("track {track} is {actual}, expected {expected}")]
    StateConflict {
        track: TrackId,
        expected: TrackState,
        actual: TrackState,
    },

    /// Structural edits are refused once a pipeline depends on the graph.
    #[error("graph {0} is sealed")]
    GraphSealed(GraphId),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("graph store lock poisoned")]
    LockPoisoned,

    /// The backing store could not complete the operation.
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: u64) -> Self {
        StoreError::NotFound { kind, id }
    }
}

/// Convenience alias used throughout the store module.
pub type Result<T> = std::result::Result<T, StoreError>;
