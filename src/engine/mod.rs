// src/engine/mod.rs

//! Execution engine for pipelines.
//!
//! This module ties together:
//! - the submission path (PENDING -> RUNNING, hand-off to the pool)
//! - the collector task that owns the bounded pool of script executions
//! - the single persister task that records results and propagates them
//!   through the DAG (see [`propagate`])

pub mod propagate;
pub mod runtime;

use crate::types::TrackId;

pub use propagate::{Propagation, plan_result, record_result};
pub use runtime::Engine;

/// Completion of one track's script, as handed to the persister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackResult {
    pub track: TrackId,
    pub exit_status: i32,
    pub output: String,
}

/// Options that influence how the engine behaves.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum number of scripts executing at once.
    pub workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { workers: 3 }
    }
}
