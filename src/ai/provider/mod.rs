//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for plain-text completion.
//! All providers return `LlmResponse` with token usage metrics.
//!
//! ## Providers
//!
//! - `cortex`: Snowflake Cortex inference REST endpoint (default)
//! - `openai`: OpenAI-compatible chat completions
//! - `ollama`: locally-running Ollama

mod cortex;
mod ollama;
mod openai;

pub use cortex::CortexProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::snowflake::SnowflakeClient;
use crate::types::{ChefError, Result};

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Generated text plus usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub content: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn with_metrics(
        content: String,
        usage: TokenUsage,
        timing: ResponseTiming,
        metadata: ResponseMetadata,
    ) -> Self {
        Self {
            content,
            usage,
            timing,
            metadata,
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage (also used by Cortex)
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared LLM provider handle; stateless, safe to share across sessions.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for one provider instance
///
/// Note: API keys are never serialized and are redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "cortex", "openai", "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderConfig {
    /// Provider settings from the `[llm]` section with a specific model
    pub fn from_llm(llm: &LlmConfig, model: &str) -> Self {
        Self {
            provider: llm.provider.clone(),
            model: model.to_string(),
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key: llm.api_key.clone(),
            api_base: llm.api_base.clone(),
            max_tokens: llm.max_tokens,
        }
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// Text completion provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a single prompt.
    async fn generate(&self, prompt: &str) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration.
///
/// The cortex provider reuses the account's Snowflake client.
pub fn create_provider(
    config: &ProviderConfig,
    snowflake: &SnowflakeClient,
) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "cortex" => Ok(Arc::new(CortexProvider::new(config.clone(), snowflake.clone()))),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(ChefError::Config(format!(
            "Unknown provider: {}. Supported: cortex, openai, ollama",
            config.provider
        ))),
    }
}
