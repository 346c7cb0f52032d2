// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::store::StoreError;
use crate::types::{GraphId, TrackId, TrackState};

#[derive(Error, Debug)]
pub enum PipeflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A pipeline was requested from a graph that never passed validation.
    #[error("graph {0} has not been validated as a DAG")]
    GraphNotValidated(GraphId),

    #[error("Cycle detected in graph: {0}")]
    CycleDetected(String),

    /// A declared parameter has no usable value, or cannot be coerced.
    #[error("parameter error: {0}")]
    ParameterTypeError(String),

    #[error("track {track} is {state}, expected PENDING")]
    TrackNotPending { track: TrackId, state: TrackState },

    #[error("track {0} has no rendered script")]
    MissingScript(TrackId),

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// The engine's background tasks are gone; no more submissions.
    #[error("execution engine is stopped")]
    EngineStopped,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipeflowError>;
