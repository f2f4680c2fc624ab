//! Named discrepancy categories reported by verifiers

/// Prologue/epilogue or stack slot layout differs.
pub const STACK_FRAME: &str = "stack frame";

/// Same operations, different registers.
pub const REGISTER_ALLOCATION: &str = "register allocation";

/// Same instructions, different order.
pub const INSTRUCTION_ORDERING: &str = "instruction ordering";

/// Reported when verification never ran because the compile failed.
pub const COMPILATION_FAILED: &str = "compilation failed";

/// Candidate source has no function body to compare.
pub const INVALID_SOURCE: &str = "invalid C code structure";

/// Fallback when a backend reports a mismatch without naming it.
pub const UNCLASSIFIED: &str = "unclassified difference";

/// Keyword to category table used when classifying diff tool output.
pub fn keyword_categories() -> &'static [(&'static str, &'static str)] {
    &[
        ("stack", STACK_FRAME),
        ("frame", STACK_FRAME),
        ("register", REGISTER_ALLOCATION),
        ("regalloc", REGISTER_ALLOCATION),
        ("order", INSTRUCTION_ORDERING),
        ("instruction", INSTRUCTION_ORDERING),
    ]
}
