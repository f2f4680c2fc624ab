//! HTTP decompilation service backend

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;
use crate::generator::{CodeGenerator, GeneratedSource};
use crate::models::Fragment;

/// Confidence assumed when the service does not report one.
const DEFAULT_REMOTE_CONFIDENCE: f32 = 0.5;

/// Request body for the decompilation endpoint
#[derive(Debug, Serialize)]
struct DecompileRequest<'a> {
    assembly: &'a str,
    function_name: &'a str,
    model: &'a str,
}

/// Response from the decompilation endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DecompileResponse {
    success: bool,
    #[serde(default)]
    c_code: String,
    explanation: Option<String>,
    confidence: Option<f32>,
}

impl DecompileResponse {
    pub(crate) fn into_generated(self) -> Result<GeneratedSource, GenerationError> {
        if !self.success {
            let reason = self
                .explanation
                .unwrap_or_else(|| "service reported failure".to_string());
            return Err(GenerationError::Backend(reason));
        }
        if let Some(explanation) = &self.explanation {
            debug!("Service explanation: {}", explanation);
        }
        Ok(GeneratedSource::new(
            self.c_code,
            self.confidence.unwrap_or(DEFAULT_REMOTE_CONFIDENCE),
        ))
    }
}

/// Generator backed by a remote model service.
pub struct RemoteGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model_provider: String,
    timeout: Duration,
}

impl RemoteGenerator {
    /// Create a client for the service at `base_url`.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model_provider: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Backend(format!("failed to build HTTP client: {}", e)))?;

        if api_key.is_none() {
            warn!("No API key configured for the generation service");
        }

        Ok(Self {
            client,
            endpoint: format!("{}/v1/decompile", base_url.trim_end_matches('/')),
            api_key,
            model_provider: model_provider.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else if error.is_connect() || error.is_request() {
            GenerationError::Unreachable(error.to_string())
        } else {
            GenerationError::Backend(error.to_string())
        }
    }
}

#[async_trait]
impl CodeGenerator for RemoteGenerator {
    fn name(&self) -> &str {
        "remote"
    }

    async fn produce(&self, fragment: &Fragment) -> Result<GeneratedSource, GenerationError> {
        info!(
            "Requesting decompilation of {} from {} (model provider: {})",
            fragment.identifier(),
            self.endpoint,
            self.model_provider
        );

        let body = DecompileRequest {
            assembly: fragment.text(),
            function_name: fragment.identifier(),
            model: &self.model_provider,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Backend(format!(
                "service answered HTTP {}",
                status
            )));
        }

        let parsed: DecompileResponse = response.json().await.map_err(|e| self.classify(e))?;
        let generated = parsed.into_generated()?;

        info!(
            "Received {} bytes of source for {}",
            generated.source.len(),
            fragment.identifier()
        );
        Ok(generated)
    }
}
