//! Compilation of candidate source
//!
//! Every [`Compiler`] runs the bracket balance gate in
//! [`Compiler::compile`] before its backend is consulted, so malformed
//! candidates never reach an external toolchain.

mod mock;
pub mod structure;
mod subprocess;
#[cfg(test)]
mod tests;

use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::errors::CompilerError;
use crate::models::CompilationOutcome;

pub use self::mock::MockCompiler;
pub use self::subprocess::SubprocessCompiler;

/// Identity of the toolchain behind a compiler backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInfo {
    pub path: PathBuf,
    pub version: Option<String>,
}

/// Backend capable of compiling C source to an object file.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Describe the toolchain.
    fn describe(&self) -> CompilerInfo;

    /// Backend-specific compilation of structurally sound source.
    async fn compile_checked(&self, source: &str) -> Result<CompilationOutcome, CompilerError>;

    /// Compile candidate source.
    ///
    /// Diagnostics are returned in the outcome; only toolchain failures are errors.
    async fn compile(&self, source: &str) -> Result<CompilationOutcome, CompilerError> {
        if !structure::is_balanced(source) {
            warn!("Candidate source has unbalanced brackets, skipping toolchain");
            return Ok(CompilationOutcome::invalid_structure());
        }

        debug!(
            "Compiling {} bytes of source with {}",
            source.len(),
            self.describe().path.display()
        );

        let outcome = self.compile_checked(source).await?;
        info!(
            "Compilation finished: success={}, {} errors, {} warnings",
            outcome.success,
            outcome.errors.len(),
            outcome.warnings.len()
        );
        Ok(outcome)
    }
}
