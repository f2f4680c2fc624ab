//! Pipeline stage identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three stages every run passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generate,
    Compile,
    Verify,
}

impl Stage {
    /// Label used in errors, progress events and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Compile => "compile",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
