//! Local skeleton generator

use async_trait::async_trait;

use crate::constants::discrepancy::{REGISTER_ALLOCATION, STACK_FRAME};
use crate::constants::TEMPLATE_CONFIDENCE;
use crate::errors::GenerationError;
use crate::generator::{CodeGenerator, GeneratedSource};
use crate::models::fragment::is_identifier;
use crate::models::Fragment;

/// Deterministic generator that emits a compilable function skeleton.
#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the skeleton for a fragment.
    pub fn render(fragment: &Fragment) -> String {
        let instructions = fragment
            .text()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.ends_with(':') && !line.starts_with(['#', '.', ';']))
            .count();

        let mut code = String::new();
        code.push_str("// Generated C code from assembly\n");
        code.push_str(&format!("// {} instructions in original\n", instructions));
        code.push_str("#include <stdio.h>\n");
        code.push_str("#include <stdlib.h>\n\n");
        code.push_str(&format!("int {}(void) {{\n", fragment.identifier()));
        code.push_str("    return 0;\n");
        code.push_str("}\n");
        code
    }
}

#[async_trait]
impl CodeGenerator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn produce(&self, fragment: &Fragment) -> Result<GeneratedSource, GenerationError> {
        if !is_identifier(fragment.identifier()) {
            return Err(GenerationError::Backend(format!(
                "`{}` is not a valid C function name",
                fragment.identifier()
            )));
        }
        Ok(GeneratedSource::new(Self::render(fragment), TEMPLATE_CONFIDENCE))
    }

    async fn refine(
        &self,
        _fragment: &Fragment,
        source: &str,
        discrepancies: &[String],
    ) -> Result<String, GenerationError> {
        let mut notes = Vec::new();
        if discrepancies.iter().any(|d| d.contains("stack")) {
            notes.push(STACK_FRAME);
        }
        if discrepancies.iter().any(|d| d.contains("register")) {
            notes.push(REGISTER_ALLOCATION);
        }

        let mut refined = source.to_string();
        for note in notes {
            refined = refined.replacen(
                "    return 0;",
                &format!("    /* mismatch: {} */\n    return 0;", note),
                1,
            );
        }
        Ok(refined)
    }
}
