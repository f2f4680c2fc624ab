//! Data models for the decompilation pipeline

pub mod fragment;
pub mod outcome;
pub mod progress;
pub mod run;
pub mod stage;
pub mod verdict;

pub use self::fragment::Fragment;
pub use self::outcome::{ArtifactRef, CompilationOutcome};
pub use self::progress::{ProgressEvent, ProgressStage};
pub use self::run::{PipelineRun, RunId, RunStatus};
pub use self::stage::Stage;
pub use self::verdict::VerificationVerdict;
