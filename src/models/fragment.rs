//! Assembly fragments supplied to the pipeline

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_FUNCTION_NAME;

/// A unit of assembly-like text to decompile.
///
/// The identifier is resolved once at construction and never changes; the
/// pipeline only ever borrows fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    text: String,
    identifier: String,
    origin: Option<String>,
}

impl Fragment {
    /// Create a fragment, inferring its identifier from the text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let identifier = extract_identifier(&text)
            .unwrap_or_else(|| DEFAULT_FUNCTION_NAME.to_string());
        Self {
            text,
            identifier,
            origin: None,
        }
    }

    /// Create a fragment with a caller-supplied identifier.
    ///
    /// A hint that is not a C identifier falls back to inference.
    pub fn with_identifier(text: impl Into<String>, hint: &str) -> Self {
        let mut fragment = Self::new(text);
        let hint = hint.trim();
        if is_identifier(hint) {
            fragment.identifier = hint.to_string();
        }
        fragment
    }

    /// Attach a reference to where the fragment came from (file name, editor buffer).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Empty or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Whether the identifier came from the text or a hint rather than the placeholder.
    pub fn has_named_identifier(&self) -> bool {
        self.identifier != DEFAULT_FUNCTION_NAME
    }
}

/// Find the function name in assembly text.
///
/// The first line holding either a `.fn name` directive or a leading
/// `name:` label wins.
pub fn extract_identifier(text: &str) -> Option<String> {
    for line in text.lines() {
        if let Some(name) = fn_directive(line) {
            return Some(name.to_string());
        }
        if let Some(name) = leading_label(line) {
            return Some(name.to_string());
        }
    }
    None
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => chars.all(is_word_char),
        _ => false,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `.fn <word>` anywhere on the line.
fn fn_directive(line: &str) -> Option<&str> {
    for (idx, _) in line.match_indices(".fn") {
        let rest = &line[idx + 3..];
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() {
            continue;
        }
        let end = trimmed
            .find(|c: char| !is_word_char(c))
            .unwrap_or(trimmed.len());
        if end > 0 {
            return Some(&trimmed[..end]);
        }
    }
    None
}

/// `[A-Za-z_][A-Za-z0-9_]*:` at column zero.
fn leading_label(line: &str) -> Option<&str> {
    let first = line.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let end = line.find(|c: char| !is_word_char(c))?;
    if line[end..].starts_with(':') {
        Some(&line[..end])
    } else {
        None
    }
}
