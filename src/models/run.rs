//! Completed pipeline runs

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CompilationOutcome, Fragment, VerificationVerdict};

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique, time-ordered run identifier.
///
/// Ids sort lexicographically in creation order: a zero-padded millisecond
/// timestamp followed by a zero-padded process-wide sequence number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn next() -> Self {
        let millis = Utc::now().timestamp_millis().max(0);
        let seq = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self::compose(millis, seq)
    }

    /// Both parts are padded to their full width so string order is numeric order.
    pub(crate) fn compose(millis: i64, seq: u64) -> Self {
        Self(format!("decomp_{:013}_{:020}", millis, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate verdict of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Warning,
    Error,
}

impl RunStatus {
    /// `error` when the candidate did not compile, `warning` when it compiled
    /// but did not match, `success` otherwise.
    pub fn derive(outcome: &CompilationOutcome, verdict: &VerificationVerdict) -> Self {
        if !outcome.success {
            Self::Error
        } else if !verdict.success {
            Self::Warning
        } else {
            Self::Success
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One completed fragment-to-verdict record. Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    id: RunId,
    fragment_identifier: String,
    source_fragment_ref: Option<String>,
    candidate_source: String,
    confidence: f32,
    status: RunStatus,
    match_percentage: Option<u8>,
    created_at: DateTime<Utc>,
    discrepancies: Option<Vec<String>>,
    compile_errors: Vec<String>,
    compile_warnings: Vec<String>,
    detailed_diff: Option<String>,
}

impl PipelineRun {
    /// Build the record for a run that reached a verdict.
    pub fn assemble(
        id: RunId,
        fragment: &Fragment,
        candidate_source: String,
        confidence: f32,
        outcome: &CompilationOutcome,
        verdict: VerificationVerdict,
    ) -> Self {
        let status = RunStatus::derive(outcome, &verdict);
        Self {
            id,
            fragment_identifier: fragment.identifier().to_string(),
            source_fragment_ref: fragment.origin().map(str::to_string),
            candidate_source,
            confidence,
            status,
            match_percentage: Some(verdict.match_percentage),
            created_at: Utc::now(),
            discrepancies: Some(verdict.discrepancies),
            compile_errors: outcome.errors.clone(),
            compile_warnings: outcome.warnings.clone(),
            detailed_diff: verdict.detailed_diff,
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn fragment_identifier(&self) -> &str {
        &self.fragment_identifier
    }

    pub fn source_fragment_ref(&self) -> Option<&str> {
        self.source_fragment_ref.as_deref()
    }

    pub fn candidate_source(&self) -> &str {
        &self.candidate_source
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn match_percentage(&self) -> Option<u8> {
        self.match_percentage
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn discrepancies(&self) -> Option<&[String]> {
        self.discrepancies.as_deref()
    }

    pub fn compile_errors(&self) -> &[String] {
        &self.compile_errors
    }

    pub fn compile_warnings(&self) -> &[String] {
        &self.compile_warnings
    }

    pub fn detailed_diff(&self) -> Option<&str> {
        self.detailed_diff.as_deref()
    }
}
