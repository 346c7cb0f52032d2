// src/config/mod.rs

//! Configuration loading and validation for pipeflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants and parse durations (`validate.rs`).
//! - Store the configured graph through a [`GraphStore`](crate::store::GraphStore)
//!   (`import.rs`).

pub mod import;
pub mod loader;
pub mod model;
pub mod validate;

pub use import::import_graph;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, GraphSection, RawConfigFile, RawConfigSection, VertexConfig};
pub use validate::parse_duration;
