//! Object file comparison through an external diff tool

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;

use crate::constants::discrepancy::UNCLASSIFIED;
use crate::constants::MATCH_THRESHOLD;
use crate::errors::VerificationError;
use crate::models::{ArtifactRef, Fragment};
use crate::utils::hash::sha256_hex;
use crate::verifier::scoring::{classify, parse_percentage};
use crate::verifier::{BinaryVerifier, Comparison};

/// Compares compiled objects with `<reference_dir>/<identifier>.o`.
///
/// Byte-identical objects are recognised by digest without running the tool.
#[derive(Debug, Clone)]
pub struct ObjdiffVerifier {
    objdiff_path: PathBuf,
    reference_dir: PathBuf,
    timeout: Duration,
}

impl ObjdiffVerifier {
    pub fn new(objdiff_path: impl Into<PathBuf>, reference_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            objdiff_path: objdiff_path.into(),
            reference_dir: reference_dir.into(),
            timeout,
        }
    }

    /// Path of the reference object for `fragment`.
    pub fn reference_for(&self, fragment: &Fragment) -> PathBuf {
        self.reference_dir.join(format!("{}.o", fragment.identifier()))
    }

    async fn run_tool(&self, reference: &Path, candidate: &Path) -> Result<String, VerificationError> {
        info!(
            "Running {} on {} and {}",
            self.objdiff_path.display(),
            reference.display(),
            candidate.display()
        );

        let mut command = Command::new(&self.objdiff_path);
        command.arg(reference).arg(candidate).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(VerificationError::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied => {
                return Err(VerificationError::Unavailable(format!(
                    "{}: {}",
                    self.objdiff_path.display(),
                    e
                )))
            }
            Ok(Err(e)) => return Err(VerificationError::Io(e)),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("exited with {}", output.status));
            return Err(VerificationError::Backend(reason));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whether the tool says the objects are identical, ignoring negated mentions.
pub(crate) fn reports_identical(report: &str) -> bool {
    report.lines().any(|line| {
        let lower = line.to_lowercase();
        lower.contains("identical")
            && !["not identical", "non-identical", "nonidentical", "isn't identical", "aren't identical"]
                .iter()
                .any(|negated| lower.contains(negated))
    })
}

#[async_trait]
impl BinaryVerifier for ObjdiffVerifier {
    fn name(&self) -> &str {
        "objdiff"
    }

    async fn compare(
        &self,
        fragment: &Fragment,
        _source: &str,
        artifact: Option<&ArtifactRef>,
    ) -> Result<Comparison, VerificationError> {
        let artifact = artifact.ok_or(VerificationError::MissingArtifact)?;

        let reference = self.reference_for(fragment);
        let reference_bytes = match tokio::fs::read(&reference).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VerificationError::MissingReference(
                    fragment.identifier().to_string(),
                ))
            }
            Err(e) => return Err(VerificationError::Io(e)),
        };

        if sha256_hex(&reference_bytes) == artifact.digest() {
            debug!("{} is byte-identical to its reference", fragment.identifier());
            return Ok(Comparison::identical());
        }

        let report = self.run_tool(&reference, artifact.path()).await?;
        let score = match parse_percentage(&report) {
            Some(percent) => percent,
            None if reports_identical(&report) => 100,
            None => 0,
        };

        let mut discrepancies = classify(&report);
        if score <= MATCH_THRESHOLD as u32 && discrepancies.is_empty() {
            discrepancies.push(UNCLASSIFIED.to_string());
        }

        Ok(Comparison {
            score,
            discrepancies,
            detailed_diff: Some(report),
        })
    }
}
