// src/exec/mod.rs

//! Script execution layer.
//!
//! - [`backend`] provides the `ScriptRunner` trait the engine calls through,
//!   so tests can replace real processes with scripted outcomes.
//! - [`shell`] is the production runner: one OS command per script line.

pub mod backend;
pub mod shell;

pub use backend::{ScriptOutcome, ScriptRunner};
pub use shell::ShellRunner;
