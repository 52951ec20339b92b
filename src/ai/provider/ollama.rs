//! Ollama Local LLM Provider
//!
//! LLM provider for locally-running Ollama models, useful for trying the
//! assistant without an account-hosted model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::types::{ChefError, ErrorCategory, ErrorClassifier, LlmError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const PROVIDER: &str = "ollama";

/// Ollama Local LLM Provider
#[derive(Debug)]
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let api_base = Self::validate_endpoint(&api_base)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChefError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model: config.model,
            temperature: config.temperature,
            client,
        })
    }

    /// Only allows http/https schemes and warns for non-localhost endpoints.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            ChefError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChefError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn build_request(&self, prompt: &str) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: self.temperature,
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        info!(
            "Generating with Ollama (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt);
        let url = format!("{}/api/generate", self.api_base);

        debug!("Sending request to Ollama API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::with_provider(
                        ErrorCategory::Network,
                        format!(
                            "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                            self.api_base
                        ),
                        PROVIDER,
                    )
                } else {
                    ErrorClassifier::classify_transport(&e, PROVIDER)
                }
            })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            return Err(ErrorClassifier::classify_response(response, PROVIDER)
                .await
                .into());
        }

        let response_body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, PROVIDER))?;

        let usage = TokenUsage::from_ollama(
            response_body.prompt_eval_count.unwrap_or(0),
            response_body.eval_count.unwrap_or(0),
        );

        Ok(LlmResponse::with_metrics(
            response_body.response,
            usage,
            ResponseTiming::from_duration(elapsed),
            ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        ))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}
