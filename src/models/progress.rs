//! Progress notifications published by the coordinator

use std::fmt;

use serde::Serialize;

use crate::models::{RunId, Stage};

/// Where a run is when an event is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Generate,
    Compile,
    Verify,
    Complete,
    Failed,
}

impl From<Stage> for ProgressStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Generate => Self::Generate,
            Stage::Compile => Self::Compile,
            Stage::Verify => Self::Verify,
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Generate => "generate",
            Self::Compile => "compile",
            Self::Verify => "verify",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Stage boundary notification. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub run_id: RunId,
    pub stage: ProgressStage,
    pub percent_complete: u8,
    pub message: String,
}
