//! Runtime configuration for the pipeline backends

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::compiler::{Compiler, MockCompiler, SubprocessCompiler};
use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::generator::{CodeGenerator, RemoteGenerator, TemplateGenerator};
use crate::history::ResultStore;
use crate::pipeline::PipelineCoordinator;
use crate::verifier::{BinaryVerifier, HeuristicVerifier, ObjdiffVerifier};

const MIN_TIMEOUT_MS: u64 = 1_000;
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Which implementation backs a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process stand-in, no external services.
    #[default]
    Mock,
    /// External service or tool.
    Real,
}

impl BackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Some(Self::Mock),
            "real" => Some(Self::Real),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_provider: String,
    pub timeout_ms: u64,
    pub debug: bool,
    pub generator_backend: BackendKind,
    pub compiler_backend: BackendKind,
    pub verifier_backend: BackendKind,
    pub compiler_path: PathBuf,
    pub compiler_args: Vec<String>,
    pub objdiff_path: PathBuf,
    pub reference_dir: Option<PathBuf>,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "http://localhost:8080".to_string(),
            model_provider: "openai".to_string(),
            timeout_ms: 30_000,
            debug: false,
            generator_backend: BackendKind::Mock,
            compiler_backend: BackendKind::Mock,
            verifier_backend: BackendKind::Mock,
            compiler_path: PathBuf::from("cc"),
            compiler_args: Vec::new(),
            objdiff_path: PathBuf::from("objdiff"),
            reference_dir: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    /// Defaults overridden by `DECOMP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `DECOMP_*` key.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = var("DECOMP_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Some(base_url) = var("DECOMP_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(provider) = var("DECOMP_MODEL_PROVIDER") {
            config.model_provider = provider;
        }
        if let Some(timeout) = var("DECOMP_TIMEOUT_MS").and_then(|s| s.trim().parse().ok()) {
            config.timeout_ms = timeout;
        }
        if let Some(debug) = var("DECOMP_DEBUG") {
            config.debug = matches!(debug.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(kind) = var("DECOMP_GENERATOR").and_then(|s| BackendKind::parse(&s)) {
            config.generator_backend = kind;
        }
        if let Some(kind) = var("DECOMP_COMPILER").and_then(|s| BackendKind::parse(&s)) {
            config.compiler_backend = kind;
        }
        if let Some(kind) = var("DECOMP_VERIFIER").and_then(|s| BackendKind::parse(&s)) {
            config.verifier_backend = kind;
        }
        if let Some(path) = var("DECOMP_COMPILER_PATH") {
            config.compiler_path = PathBuf::from(path);
        }
        if let Some(args) = var("DECOMP_COMPILER_ARGS") {
            config.compiler_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(path) = var("DECOMP_OBJDIFF_PATH") {
            config.objdiff_path = PathBuf::from(path);
        }
        if let Some(dir) = var("DECOMP_REFERENCE_DIR") {
            config.reference_dir = Some(PathBuf::from(dir));
        }
        if let Some(limit) = var("DECOMP_HISTORY_LIMIT").and_then(|s| s.trim().parse().ok()) {
            config.history_limit = limit;
        }

        config
    }

    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Problems that would prevent the configured backends from working.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.generator_backend == BackendKind::Real
            && self.api_key.as_deref().map_or(true, |key| key.trim().is_empty())
        {
            problems.push("API key is required for the remote generator".to_string());
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            problems.push(format!(
                "timeout must be between {} and {} ms, got {}",
                MIN_TIMEOUT_MS, MAX_TIMEOUT_MS, self.timeout_ms
            ));
        }
        if self.history_limit == 0 {
            problems.push("history limit must be greater than zero".to_string());
        }
        if self.verifier_backend == BackendKind::Real && self.reference_dir.is_none() {
            problems.push("reference directory is required for the objdiff verifier".to_string());
        }
        if self.verifier_backend == BackendKind::Real && self.compiler_backend == BackendKind::Mock {
            problems.push("the objdiff verifier needs real object files from the subprocess compiler".to_string());
        }

        problems
    }

    /// History store sized by this config.
    pub fn build_store(&self) -> Arc<ResultStore> {
        Arc::new(ResultStore::with_limit(self.history_limit))
    }

    /// Construct the configured backends around `store`.
    pub fn build_coordinator(&self, store: Arc<ResultStore>) -> Result<PipelineCoordinator> {
        let problems = self.validate();
        if !problems.is_empty() {
            anyhow::bail!("Invalid configuration: {}", problems.join("; "));
        }

        let generator: Arc<dyn CodeGenerator> = match self.generator_backend {
            BackendKind::Mock => Arc::new(TemplateGenerator::new()),
            BackendKind::Real => Arc::new(
                RemoteGenerator::new(&self.base_url, self.api_key.clone(), &self.model_provider, self.timeout())
                    .context("Failed to create remote generator")?,
            ),
        };
        let compiler: Arc<dyn Compiler> = match self.compiler_backend {
            BackendKind::Mock => Arc::new(MockCompiler::new()),
            BackendKind::Real => Arc::new(SubprocessCompiler::new(
                &self.compiler_path,
                self.compiler_args.clone(),
                self.timeout(),
            )),
        };
        let verifier: Arc<dyn BinaryVerifier> = match (self.verifier_backend, &self.reference_dir) {
            (BackendKind::Real, Some(reference_dir)) => Arc::new(ObjdiffVerifier::new(
                &self.objdiff_path,
                reference_dir,
                self.timeout(),
            )),
            _ => Arc::new(HeuristicVerifier::new()),
        };

        info!(
            "Pipeline backends: generator={} compiler={} verifier={}",
            generator.name(),
            compiler.describe().path.display(),
            verifier.name()
        );

        Ok(PipelineCoordinator::new(generator, compiler, verifier, store))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.model_provider, "openai");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.generator_backend, BackendKind::Mock);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DECOMP_API_KEY", "secret"),
            ("DECOMP_TIMEOUT_MS", "5000"),
            ("DECOMP_DEBUG", "true"),
            ("DECOMP_GENERATOR", "REAL"),
            ("DECOMP_COMPILER_ARGS", "-O2 -fno-inline"),
            ("DECOMP_HISTORY_LIMIT", "not a number"),
            ("DECOMP_VERIFIER", "bogus"),
        ]));

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout_ms, 5000);
        assert!(config.debug);
        assert_eq!(config.generator_backend, BackendKind::Real);
        assert_eq!(config.compiler_args, vec!["-O2".to_string(), "-fno-inline".to_string()]);
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.verifier_backend, BackendKind::Mock);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let config = Config {
            generator_backend: BackendKind::Real,
            compiler_backend: BackendKind::Real,
            verifier_backend: BackendKind::Real,
            timeout_ms: 500,
            history_limit: 0,
            ..Config::default()
        };
        let problems = config.validate();
        assert_eq!(problems.len(), 4, "{:?}", problems);
        assert!(problems[0].contains("API key"));
        assert!(problems[1].contains("timeout"));

        let config = Config {
            timeout_ms: 300_001,
            ..Config::default()
        };
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_objdiff_requires_subprocess_compiler() {
        let config = Config {
            verifier_backend: BackendKind::Real,
            reference_dir: Some(PathBuf::from("/refs")),
            ..Config::default()
        };
        let problems = config.validate();
        assert_eq!(problems.len(), 1, "{:?}", problems);
        assert!(problems[0].contains("subprocess compiler"));
        assert!(config.build_coordinator(Arc::new(ResultStore::new())).is_err());

        let config = Config {
            compiler_backend: BackendKind::Real,
            ..config
        };
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_from_file_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"compiler_backend": "real", "compiler_path": "/usr/bin/gcc", "history_limit": 5}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.compiler_backend, BackendKind::Real);
        assert_eq!(config.compiler_path, PathBuf::from("/usr/bin/gcc"));
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.base_url, "http://localhost:8080");

        assert!(Config::from_file(&dir.path().join("missing.json")).is_err());
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_build_coordinator_rejects_invalid_config() {
        let config = Config {
            history_limit: 0,
            ..Config::default()
        };
        let store = Arc::new(ResultStore::new());
        assert!(config.build_coordinator(store).is_err());
    }

    #[tokio::test]
    async fn test_build_mock_coordinator() {
        let config = Config {
            history_limit: 2,
            ..Config::default()
        };
        let store = config.build_store();
        let coordinator = config.build_coordinator(Arc::clone(&store)).unwrap();

        let fragment = crate::models::Fragment::new("memcpy:\n    lwz r3, 0(r4)\n    blr\n");
        let run = coordinator.run(&fragment).await.unwrap();
        assert_eq!(run.match_percentage(), Some(85));
        assert_eq!(store.len(), 1);
        assert_eq!(store.max_retained(), 2);
    }
}
