//! Candidate C source generation
//!
//! A [`CodeGenerator`] turns an assembly fragment into candidate source. The
//! trait's provided [`CodeGenerator::generate`] enforces the contract shared by
//! every backend: blank fragments are rejected before the backend is touched,
//! empty output is an error, and confidence always lands in `[0, 1]`.

mod remote;
mod template;

use async_trait::async_trait;
use log::debug;

use crate::errors::GenerationError;
use crate::models::Fragment;

pub use self::remote::RemoteGenerator;
pub use self::template::TemplateGenerator;

/// Candidate source and the backend's confidence in it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSource {
    pub source: String,
    pub confidence: f32,
}

impl GeneratedSource {
    pub fn new(source: impl Into<String>, confidence: f32) -> Self {
        Self {
            source: source.into(),
            confidence,
        }
    }

    fn clamped(mut self) -> Self {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        self
    }
}

/// Backend capable of producing C source from assembly.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Backend-specific generation. Callers use [`CodeGenerator::generate`].
    async fn produce(&self, fragment: &Fragment) -> Result<GeneratedSource, GenerationError>;

    /// Generate candidate source for `fragment`.
    async fn generate(&self, fragment: &Fragment) -> Result<GeneratedSource, GenerationError> {
        if fragment.is_blank() {
            return Err(GenerationError::EmptyFragment);
        }

        debug!(
            "Generating source for {} with {} backend ({} bytes of assembly)",
            fragment.identifier(),
            self.name(),
            fragment.text().len()
        );

        let generated = self.produce(fragment).await?;
        if generated.source.trim().is_empty() {
            return Err(GenerationError::EmptyOutput);
        }

        Ok(generated.clamped())
    }

    /// Rework `source` in light of verification discrepancies.
    ///
    /// Only ever called by the user of the pipeline; a refined candidate is
    /// verified with a fresh run.
    async fn refine(
        &self,
        _fragment: &Fragment,
        source: &str,
        _discrepancies: &[String],
    ) -> Result<String, GenerationError> {
        Ok(source.to_string())
    }
}
