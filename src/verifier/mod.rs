//! Verification of compiled candidates against the original fragment
//!
//! Backends implement [`BinaryVerifier::compare`] and report a raw
//! [`Comparison`]. The provided [`BinaryVerifier::verify`] owns the contract:
//! it never consults a backend for a failed compile, and it turns every raw
//! comparison into a verdict through [`scoring::normalize`], which applies the
//! match threshold.

mod heuristic;
mod objdiff;
pub mod scoring;

use async_trait::async_trait;
use log::{debug, info};

use crate::errors::VerificationError;
use crate::models::{ArtifactRef, CompilationOutcome, Fragment, VerificationVerdict};

pub use self::heuristic::HeuristicVerifier;
pub use self::objdiff::ObjdiffVerifier;

/// Raw result reported by a comparison backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    /// Backend score; values above 100 are clamped.
    pub score: u32,
    pub discrepancies: Vec<String>,
    pub detailed_diff: Option<String>,
}

impl Comparison {
    /// Byte-identical match.
    pub fn identical() -> Self {
        Self {
            score: 100,
            discrepancies: Vec::new(),
            detailed_diff: None,
        }
    }
}

/// Backend capable of scoring a compiled candidate.
#[async_trait]
pub trait BinaryVerifier: Send + Sync {
    fn name(&self) -> &str;

    /// Compare the compiled candidate with the original.
    ///
    /// `artifact` is the compiled object; backends without object access work
    /// on `source` instead.
    async fn compare(
        &self,
        fragment: &Fragment,
        source: &str,
        artifact: Option<&ArtifactRef>,
    ) -> Result<Comparison, VerificationError>;

    /// Produce a verdict for a compilation outcome.
    async fn verify(
        &self,
        fragment: &Fragment,
        source: &str,
        outcome: &CompilationOutcome,
    ) -> Result<VerificationVerdict, VerificationError> {
        if !outcome.success {
            debug!("Skipping comparison for {}: compilation failed", fragment.identifier());
            return Ok(VerificationVerdict::compilation_failed());
        }

        let comparison = self
            .compare(fragment, source, outcome.artifact.as_ref())
            .await?;
        let verdict = scoring::normalize(comparison);

        info!(
            "Verification of {} with {} backend: {}% match (success={})",
            fragment.identifier(),
            self.name(),
            verdict.match_percentage,
            verdict.success
        );
        Ok(verdict)
    }
}
