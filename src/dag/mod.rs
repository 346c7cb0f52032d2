// src/dag/mod.rs

//! Graph structure, validation and pipeline instantiation.
//!
//! - [`graph`] is an adjacency view over a stored graph, used by propagation.
//! - [`validator`] decides acyclicity and owns the durable `validated` flag.
//! - [`instantiate`] turns a validated graph into a pipeline with tracks.

pub mod graph;
pub mod instantiate;
pub mod validator;

pub use graph::DagGraph;
pub use instantiate::start_pipeline;
pub use validator::{GraphValidator, validate};
