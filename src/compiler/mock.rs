//! In-process stand-in for a real toolchain

use std::path::PathBuf;

use async_trait::async_trait;

use crate::compiler::{Compiler, CompilerInfo};
use crate::errors::CompilerError;
use crate::models::{ArtifactRef, CompilationOutcome};
use crate::utils::hash::sha256_hex;

/// Accepts any source with an `#include` and a function body.
#[derive(Debug, Clone, Default)]
pub struct MockCompiler;

impl MockCompiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Compiler for MockCompiler {
    fn describe(&self) -> CompilerInfo {
        CompilerInfo {
            path: PathBuf::from("mock-cc"),
            version: Some("Mock Compiler v1.0.0".to_string()),
        }
    }

    async fn compile_checked(&self, source: &str) -> Result<CompilationOutcome, CompilerError> {
        let has_include = source.contains("#include");
        let has_body = source.contains('{') && source.contains('}');

        if !has_include || !has_body {
            return Ok(CompilationOutcome::failed(
                vec!["Invalid C code structure".to_string()],
                vec!["Missing includes or function brackets".to_string()],
            ));
        }

        let has_main = source.contains("int main") || source.contains("void main");
        let warnings = if has_main {
            Vec::new()
        } else {
            vec!["No main function found".to_string()]
        };

        // The "object" is the source itself, so identical source means identical artifact.
        let digest = sha256_hex(source.as_bytes());
        let path = std::env::temp_dir().join(format!("compiled_{}.o", &digest[..12]));
        Ok(CompilationOutcome::succeeded(ArtifactRef::new(path, digest), warnings))
    }
}
