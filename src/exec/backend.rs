// src/exec/backend.rs

//! Pluggable script runner abstraction.
//!
//! The engine talks to a `ScriptRunner` instead of spawning processes
//! itself. Production code uses [`ShellRunner`](super::ShellRunner); tests
//! can provide a runner that returns scripted outcomes without touching the
//! OS.

use std::future::Future;
use std::pin::Pin;

/// Result of executing one rendered script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Bitwise OR of every command's exit code; `0` means success.
    pub exit_status: i32,
    /// Combined stdout/stderr of all commands, in execution order.
    pub output: String,
}

/// Trait abstracting how a rendered script is executed.
pub trait ScriptRunner: Send + Sync {
    /// Execute `script` to completion.
    ///
    /// Runner failures (a command that cannot be spawned, a timeout) are
    /// reported through a nonzero `exit_status`, never as a panic.
    fn run(&self, script: String) -> Pin<Box<dyn Future<Output = ScriptOutcome> + Send + '_>>;
}
