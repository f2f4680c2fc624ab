//! External toolchain backend

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::compiler::{Compiler, CompilerInfo};
use crate::errors::CompilerError;
use crate::models::{ArtifactRef, CompilationOutcome};
use crate::utils::hash::sha256_hex;

/// Runs a C compiler in a throwaway workspace.
///
/// The workspace travels with the returned [`ArtifactRef`] and is deleted
/// when the outcome is dropped. Failed compiles delete it immediately.
/// The toolchain version is queried once, before the first compile.
#[derive(Debug, Clone)]
pub struct SubprocessCompiler {
    compiler_path: PathBuf,
    extra_args: Vec<String>,
    timeout: Duration,
    version: OnceCell<Option<String>>,
}

impl SubprocessCompiler {
    pub fn new(compiler_path: impl Into<PathBuf>, extra_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            compiler_path: compiler_path.into(),
            extra_args,
            timeout,
            version: OnceCell::new(),
        }
    }

    /// First line of `<compiler> <extra args> --version`, if the toolchain answers.
    pub async fn query_version(&self) -> Result<Option<String>, CompilerError> {
        let mut command = Command::new(&self.compiler_path);
        command.args(&self.extra_args).arg("--version");
        let output = self.run(&mut command).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string))
    }

    /// Query the version unless an earlier call already did.
    pub async fn detect_version(&self) -> Option<String> {
        self.version
            .get_or_init(|| async {
                match self.query_version().await {
                    Ok(version) => {
                        debug!("{} reports version {:?}", self.compiler_path.display(), version);
                        version
                    }
                    Err(e) => {
                        debug!("Could not query {} version: {}", self.compiler_path.display(), e);
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn run(&self, command: &mut Command) -> Result<std::process::Output, CompilerError> {
        command.kill_on_drop(true);
        match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => Err(CompilerError::Timeout(self.timeout)),
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::PermissionDenied => {
                Err(CompilerError::Unavailable(format!(
                    "{}: {}",
                    self.compiler_path.display(),
                    e
                )))
            }
            Ok(Err(e)) => Err(CompilerError::Io(e)),
            Ok(Ok(output)) => Ok(output),
        }
    }

    async fn collect_artifact(&self, object: &Path) -> Result<String, CompilerError> {
        let bytes = tokio::fs::read(object).await?;
        Ok(sha256_hex(&bytes))
    }
}

/// Split compiler stderr into (errors, warnings).
pub(crate) fn classify_diagnostics(stderr: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for line in stderr.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let lower = line.to_lowercase();
        if lower.contains("warning") {
            warnings.push(line.to_string());
        } else if lower.contains("error") {
            errors.push(line.to_string());
        }
    }

    (errors, warnings)
}

#[async_trait]
impl Compiler for SubprocessCompiler {
    fn describe(&self) -> CompilerInfo {
        CompilerInfo {
            path: self.compiler_path.clone(),
            version: self.version.get().cloned().flatten(),
        }
    }

    async fn compile_checked(&self, source: &str) -> Result<CompilationOutcome, CompilerError> {
        self.detect_version().await;

        let workspace = tempfile::Builder::new().prefix("decomp-").tempdir()?;
        let input = workspace.path().join("candidate.c");
        let object = workspace.path().join("candidate.o");
        tokio::fs::write(&input, source).await?;

        info!(
            "Running {} on {}",
            self.compiler_path.display(),
            input.display()
        );

        let mut command = Command::new(&self.compiler_path);
        command
            .args(&self.extra_args)
            .arg("-c")
            .arg(&input)
            .arg("-o")
            .arg(&object);
        let output = self.run(&mut command).await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let (mut errors, warnings) = classify_diagnostics(&stderr);

        if output.status.success() && object.exists() {
            let digest = self.collect_artifact(&object).await?;
            debug!("Object {} has digest {}", object.display(), digest);
            return Ok(CompilationOutcome::succeeded(
                ArtifactRef::in_workspace(object, digest, workspace),
                warnings,
            ));
        }

        if errors.is_empty() {
            errors.push(format!("compiler exited with {}", output.status));
        }
        Ok(CompilationOutcome::failed(errors, warnings))
    }
}
