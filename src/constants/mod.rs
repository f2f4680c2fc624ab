//! Constants used throughout the pipeline

pub mod discrepancy;
pub mod progress;

/// Verdicts must score strictly above this to count as a match.
pub const MATCH_THRESHOLD: u8 = 90;

/// Identifier used when a fragment carries no label or `.fn` directive.
pub const DEFAULT_FUNCTION_NAME: &str = "decompiled_function";

/// Default number of runs kept in history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Compiler error for source that fails the bracket balance check.
pub const INVALID_STRUCTURE: &str = "invalid structure";

/// Confidence reported by the local template generator.
pub const TEMPLATE_CONFIDENCE: f32 = 0.8;
