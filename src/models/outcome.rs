//! Compilation outcomes

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::TempDir;

use crate::constants::INVALID_STRUCTURE;

/// Opaque handle to a compiled object.
///
/// When the object lives in a temporary workspace, the handle keeps that
/// workspace alive; it is removed once the last clone is dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRef {
    path: PathBuf,
    digest: String,
    #[serde(skip)]
    workspace: Option<Arc<TempDir>>,
}

impl ArtifactRef {
    /// Reference an object that is not owned by the pipeline.
    pub fn new(path: impl Into<PathBuf>, digest: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
            workspace: None,
        }
    }

    /// Reference an object inside a temporary workspace owned by this handle.
    pub fn in_workspace(path: impl Into<PathBuf>, digest: impl Into<String>, workspace: TempDir) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
            workspace: Some(Arc::new(workspace)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hex SHA-256 of the object bytes.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref().map(TempDir::path)
    }
}

/// Result of compiling candidate source.
#[derive(Debug, Clone, Serialize)]
pub struct CompilationOutcome {
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub artifact: Option<ArtifactRef>,
}

impl CompilationOutcome {
    pub fn succeeded(artifact: ArtifactRef, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings,
            artifact: Some(artifact),
        }
    }

    pub fn failed(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            warnings,
            artifact: None,
        }
    }

    /// Outcome of the bracket balance gate.
    pub fn invalid_structure() -> Self {
        Self::failed(vec![INVALID_STRUCTURE.to_string()], Vec::new())
    }
}
