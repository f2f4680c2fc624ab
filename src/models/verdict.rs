//! Verification verdicts

use serde::{Deserialize, Serialize};

use crate::constants::discrepancy::COMPILATION_FAILED;

/// How closely a compiled candidate matches the original fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub success: bool,
    /// Similarity score, 0 to 100.
    pub match_percentage: u8,
    pub discrepancies: Vec<String>,
    pub detailed_diff: Option<String>,
}

impl VerificationVerdict {
    /// Verdict for a candidate that never compiled.
    pub fn compilation_failed() -> Self {
        Self {
            success: false,
            match_percentage: 0,
            discrepancies: vec![COMPILATION_FAILED.to_string()],
            detailed_diff: Some("compilation errors prevent verification".to_string()),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.match_percentage == 100 && self.discrepancies.is_empty()
    }
}
