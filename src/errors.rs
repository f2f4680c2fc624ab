//! Error handling for the decompilation pipeline.
//!
//! Each stage backend reports its own failure type. These errors describe
//! resource failures only (unreachable services, missing tools, timeouts);
//! ordinary outcomes such as compiler diagnostics or a low match score are
//! carried as data in [`CompilationOutcome`](crate::models::CompilationOutcome)
//! and [`VerificationVerdict`](crate::models::VerificationVerdict).
//!
//! The coordinator wraps whichever of these aborted a run in a
//! [`PipelineError`] that names the failing stage.

use std::time::Duration;

use thiserror::Error;

use crate::models::Stage;

/// Failures of the code generation backend.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The fragment is empty or whitespace-only.
    #[error("fragment is empty")]
    EmptyFragment,

    /// The backend returned no source text.
    #[error("backend returned empty source")]
    EmptyOutput,

    /// The backend could not be reached.
    #[error("generation backend unreachable: {0}")]
    Unreachable(String),

    /// The backend did not answer in time.
    #[error("generation backend timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered, but with something we cannot use.
    #[error("generation backend error: {0}")]
    Backend(String),
}

/// Failures of the compilation backend.
///
/// A compile that merely fails with diagnostics is *not* an error.
#[derive(Error, Debug)]
pub enum CompilerError {
    /// The toolchain binary could not be started.
    #[error("compiler unavailable: {0}")]
    Unavailable(String),

    /// The toolchain did not finish in time.
    #[error("compiler timed out after {0:?}")]
    Timeout(Duration),

    /// Workspace or artifact I/O failed.
    #[error("compiler I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the comparison backend.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// The comparison tool could not be started.
    #[error("comparison backend unavailable: {0}")]
    Unavailable(String),

    /// The comparison tool did not finish in time.
    #[error("comparison backend timed out after {0:?}")]
    Timeout(Duration),

    /// No reference object exists for the fragment.
    #[error("no reference object for `{0}`")]
    MissingReference(String),

    /// The compile succeeded but produced no artifact to compare.
    #[error("compilation produced no artifact")]
    MissingArtifact,

    /// The comparison tool failed.
    #[error("comparison backend error: {0}")]
    Backend(String),

    /// Reading an object file failed.
    #[error("verification I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a stage aborted.
#[derive(Error, Debug)]
pub enum StageFailure {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The caller cancelled the run before this stage started.
    #[error("run cancelled")]
    Cancelled,
}

/// A pipeline run that aborted before reaching a verdict.
#[derive(Error, Debug)]
#[error("pipeline failed during {stage} stage: {cause}")]
pub struct PipelineError {
    /// Stage at which the run aborted.
    pub stage: Stage,
    /// Underlying failure.
    #[source]
    pub cause: StageFailure,
}

impl PipelineError {
    pub fn new(stage: Stage, cause: impl Into<StageFailure>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    pub fn cancelled(stage: Stage) -> Self {
        Self {
            stage,
            cause: StageFailure::Cancelled,
        }
    }

    /// Returns `true` when the run was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, StageFailure::Cancelled)
    }
}

/// Result type alias for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_names_stage() {
        let err = PipelineError::new(
            Stage::Generate,
            GenerationError::Unreachable("connection refused".to_string()),
        );
        let message = err.to_string();
        assert!(message.contains("generate"), "message was: {}", message);
        assert!(message.contains("connection refused"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled_error() {
        let err = PipelineError::cancelled(Stage::Verify);
        assert!(err.is_cancelled());
        assert_eq!(err.stage, Stage::Verify);
        assert_eq!(err.to_string(), "pipeline failed during verify stage: run cancelled");
    }

    #[test]
    fn test_compiler_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: CompilerError = io.into();
        assert!(matches!(err, CompilerError::Io(_)));
    }
}
