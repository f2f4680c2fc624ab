//! Verdict scoring rules

use log::warn;

use crate::constants::discrepancy::{keyword_categories, UNCLASSIFIED};
use crate::constants::MATCH_THRESHOLD;
use crate::models::VerificationVerdict;
use crate::verifier::Comparison;

/// Whether a score counts as a match. The threshold itself does not.
pub fn is_match(score: u8) -> bool {
    score > MATCH_THRESHOLD
}

/// Turn a raw backend comparison into a verdict.
///
/// Scores are clamped to 100. Reported discrepancies cap the score below the
/// threshold, and a failing verdict always names at least one discrepancy.
pub fn normalize(comparison: Comparison) -> VerificationVerdict {
    let mut score = comparison.score.min(100) as u8;
    let mut discrepancies = comparison.discrepancies;

    if !discrepancies.is_empty() && score >= MATCH_THRESHOLD {
        warn!(
            "Backend scored {}% but reported {} discrepancies, capping below threshold",
            score,
            discrepancies.len()
        );
        score = MATCH_THRESHOLD - 1;
    }

    let success = is_match(score);
    if !success && discrepancies.is_empty() {
        discrepancies.push(UNCLASSIFIED.to_string());
    }

    VerificationVerdict {
        success,
        match_percentage: score,
        discrepancies,
        detailed_diff: comparison.detailed_diff,
    }
}

/// Map free-form diff tool output to named discrepancy categories.
///
/// Categories appear once each, in order of first mention.
pub fn classify(output: &str) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for line in output.lines() {
        let lower = line.to_lowercase();
        for (keyword, category) in keyword_categories() {
            if lower.contains(keyword) && !categories.iter().any(|c| c == category) {
                categories.push(category.to_string());
            }
        }
    }
    categories
}

/// First `NN%` or `NN.N%` in `output`, rounded down.
pub fn parse_percentage(output: &str) -> Option<u32> {
    let bytes = output.as_bytes();
    for (idx, _) in output.match_indices('%') {
        let start = bytes[..idx]
            .iter()
            .rposition(|b| !(b.is_ascii_digit() || *b == b'.'))
            .map_or(0, |p| p + 1);
        let number = output[start..idx].trim_start_matches('.');
        if let Ok(value) = number.parse::<f64>() {
            return Some(value.floor() as u32);
        }
    }
    None
}
