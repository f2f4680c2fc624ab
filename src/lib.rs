//! A library for decompiling assembly fragments into C and verifying the result
//!
//! A fragment goes through three stages: a [`CodeGenerator`] proposes C
//! source, a [`Compiler`] builds it, and a [`BinaryVerifier`] scores the
//! object code against the original. The [`PipelineCoordinator`] sequences
//! the stages and records each completed run in a shared [`ResultStore`].

pub mod compiler;
pub mod config;
pub mod constants;
pub mod errors;
pub mod generator;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;
pub mod verifier;

use std::path::Path;

use anyhow::Result;
use log::info;

pub use crate::compiler::Compiler;
pub use crate::config::Config;
pub use crate::errors::{PipelineError, PipelineResult};
pub use crate::generator::CodeGenerator;
pub use crate::history::ResultStore;
pub use crate::models::{Fragment, PipelineRun, RunStatus};
pub use crate::pipeline::PipelineCoordinator;
pub use crate::verifier::BinaryVerifier;

/// Main entry point for decompiling a single fragment
pub async fn decompile_fragment(
    config: &Config,
    fragment: &Fragment,
    report_path: Option<&Path>,
) -> Result<PipelineRun> {
    let store = config.build_store();
    let coordinator = config.build_coordinator(store)?;

    let run = coordinator.run(fragment).await?;

    if let Some(path) = report_path {
        let saved = report::save_report(std::slice::from_ref(&run), path)?;
        info!("Report saved to {}", saved.display());
    }

    Ok(run)
}

/// Version of the decompiler
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
