//! Per-run state machine

use std::fmt;

use crate::models::{RunStatus, Stage};

/// Where a single run is.
///
/// Runs move strictly forward, `Idle -> Generating -> Compiling -> Verifying
/// -> Completed`, and may fail out of any working state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Generating,
    Compiling,
    Verifying,
    Completed(RunStatus),
    Failed(Stage),
}

impl RunState {
    /// State for working on `stage`.
    pub fn working(stage: Stage) -> Self {
        match stage {
            Stage::Generate => Self::Generating,
            Stage::Compile => Self::Compiling,
            Stage::Verify => Self::Verifying,
        }
    }

    /// Stage being worked on, if any.
    pub fn stage(self) -> Option<Stage> {
        match self {
            Self::Generating => Some(Stage::Generate),
            Self::Compiling => Some(Stage::Compile),
            Self::Verifying => Some(Stage::Verify),
            _ => None,
        }
    }

    /// Stage entered next from this state.
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            Self::Idle => Some(Stage::Generate),
            Self::Generating => Some(Stage::Compile),
            Self::Compiling => Some(Stage::Verify),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    /// Whether `self -> next` is a legal move.
    pub fn can_transition(self, next: RunState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Generating) => true,
            (Self::Generating, Self::Compiling) => true,
            (Self::Compiling, Self::Verifying) => true,
            (Self::Verifying, Self::Completed(_)) => true,
            // A stage fails while running, or is cancelled just before it starts.
            (current, Self::Failed(stage)) => {
                current.stage() == Some(stage) || current.next_stage() == Some(stage)
            }
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Generating => f.write_str("generating"),
            Self::Compiling => f.write_str("compiling"),
            Self::Verifying => f.write_str("verifying"),
            Self::Completed(status) => write!(f, "completed ({})", status),
            Self::Failed(stage) => write!(f, "failed during {}", stage),
        }
    }
}
