//! Verification reports and history export


use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info};

use crate::history::summarize;
use crate::models::{PipelineRun, RunStatus};

/// Render a markdown summary of `runs`.
pub fn render_report(runs: &[PipelineRun]) -> String {
    let summary = summarize(runs);

    let mut report = String::new();
    report.push_str("# Decompilation Verification Report\n\n");
    let _ = writeln!(report, "Generated: {}\n", Utc::now().to_rfc3339());

    report.push_str("## Summary\n");
    let _ = writeln!(report, "- Total functions: {}", summary.total);
    let _ = writeln!(report, "- Successful verifications: {}", summary.success);
    let _ = writeln!(report, "- Partial matches: {}", summary.warning);
    let _ = writeln!(report, "- Failed compilations: {}", summary.error);
    match summary.success_rate() {
        Some(rate) => {
            let _ = writeln!(report, "- Success rate: {:.1}%\n", rate);
        }
        None => report.push_str("- Success rate: n/a\n\n"),
    }

    let failed: Vec<&PipelineRun> = runs
        .iter()
        .filter(|run| run.status() != RunStatus::Success)
        .collect();
    if failed.is_empty() {
        return report;
    }

    report.push_str("## Failed Verifications\n\n");
    for run in failed {
        let _ = writeln!(report, "### {} ({})", run.fragment_identifier(), run.status());
        if let Some(origin) = run.source_fragment_ref() {
            let _ = writeln!(report, "- Source: {}", origin);
        }
        let _ = writeln!(report, "- Match percentage: {}%", run.match_percentage().unwrap_or(0));
        for diagnostic in run.compile_errors() {
            let _ = writeln!(report, "- Compiler: {}", diagnostic);
        }
        if let Some(discrepancies) = run.discrepancies().filter(|d| !d.is_empty()) {
            report.push_str("- Issues:\n");
            for discrepancy in discrepancies {
                let _ = writeln!(report, "  - {}", discrepancy);
            }
        }
        report.push('\n');
    }

    report
}

/// Write the markdown report for `runs` to `path`.
pub fn save_report(runs: &[PipelineRun], path: &Path) -> Result<PathBuf> {
    let report = render_report(runs);
    write_output(path, report.as_bytes())
}

/// Write `runs` as pretty JSON to `path`.
pub fn export_history_json(runs: &[PipelineRun], path: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(runs)
        .with_context(|| "Failed to serialize history to JSON")?;
    info!("Serialized {} runs to JSON ({} bytes)", runs.len(), json.len());
    write_output(path, json.as_bytes())
}

/// Write `contents` to `path`, creating parent directories. Returns the absolute path.
fn write_output(path: &Path, contents: &[u8]) -> Result<PathBuf> {
    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    if let Some(parent) = absolute_path.parent() {
        if !parent.exists() {
            info!("Creating directory: {}", parent.display());
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let mut file = File::create(&absolute_path).map_err(|e| {
        error!("Failed to create file: {} - Error: {}", absolute_path.display(), e);
        anyhow::anyhow!("Failed to create file: {} - Error: {}", absolute_path.display(), e)
    })?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write to file: {}", absolute_path.display()))?;

    info!("Wrote {} bytes to {}", contents.len(), absolute_path.display());
    Ok(absolute_path)
}
