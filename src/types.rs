use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned identifiers.
pub type GraphId = u64;
pub type VertexId = u64;
pub type EdgeId = u64;
pub type PipelineId = u64;
pub type TrackId = u64;

/// Lifecycle of a single track (one vertex inside one pipeline run).
///
/// The numeric codes match the persisted representation:
/// `WAITING=0, PENDING=1, RUNNING=2, SUCCEED=3, FAILED=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrackState {
    /// Some direct predecessor has not succeeded yet.
    Waiting,
    /// Every predecessor succeeded; eligible for submission.
    Pending,
    /// Handed to the worker pool.
    Running,
    Succeed,
    Failed,
}

impl TrackState {
    pub fn code(self) -> u8 {
        match self {
            TrackState::Waiting => 0,
            TrackState::Pending => 1,
            TrackState::Running => 2,
            TrackState::Succeed => 3,
            TrackState::Failed => 4,
        }
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackState::Waiting => "WAITING",
            TrackState::Pending => "PENDING",
            TrackState::Running => "RUNNING",
            TrackState::Succeed => "SUCCEED",
            TrackState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a pipeline run: `RUNNING -> FAILED | FINISH`.
///
/// Codes: `RUNNING=2, FAILED=4, FINISH=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineState {
    Running,
    Failed,
    Finish,
}

impl PipelineState {
    pub fn code(self) -> u8 {
        match self {
            PipelineState::Running => 2,
            PipelineState::Failed => 4,
            PipelineState::Finish => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, PipelineState::Running)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Running => "RUNNING",
            PipelineState::Failed => "FAILED",
            PipelineState::Finish => "FINISH",
        };
        f.write_str(s)
    }
}
