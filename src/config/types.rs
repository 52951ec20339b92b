//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global and project (.souschef/) level configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{links, llm, network, retrieval, retry};
use crate::constants::chat as chat_constants;
use crate::types::{Category, ChefError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Snowflake account, credentials, and service locations
    pub snowflake: SnowflakeConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Search settings
    pub retrieval: RetrievalConfig,

    /// Conversation settings
    pub chat: ChatConfig,

    /// Completion retry settings
    pub retry: RetryConfig,

    /// Answer feedback settings
    pub evaluation: EvaluationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            snowflake: SnowflakeConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            chat: ChatConfig::default(),
            retry: RetryConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges and that
    /// every key required to reach the external services is present.
    /// Returns `ChefError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        let missing = self.snowflake.missing_keys();
        if !missing.is_empty() {
            return Err(ChefError::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ChefError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 || self.retrieval.timeout_secs == 0 {
            return Err(ChefError::Config(
                "llm.timeout_secs and retrieval.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.num_chunks == 0 {
            return Err(ChefError::Config(
                "retrieval.num_chunks must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.columns.is_empty() {
            return Err(ChefError::Config(
                "retrieval.columns must not be empty".to_string(),
            ));
        }

        if self.retry.base_delay_ms == 0 {
            return Err(ChefError::Config(
                "retry.base_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_delay_secs.saturating_mul(1000) < self.retry.base_delay_ms {
            return Err(ChefError::Config(format!(
                "retry.max_delay_secs ({}s) must not be shorter than retry.base_delay_ms ({}ms)",
                self.retry.max_delay_secs, self.retry.base_delay_ms
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Snowflake Configuration
// =============================================================================

/// Account and service locations.
///
/// `token` is never serialized to output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowflakeConfig {
    /// Account URL, e.g. `https://myorg-myaccount.snowflakecomputing.com`
    pub account_url: Option<String>,
    /// Bearer token (programmatic access token or key-pair JWT)
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Value of the `X-Snowflake-Authorization-Token-Type` header
    pub token_type: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    /// Cortex Search service name
    pub search_service: Option<String>,
    /// Warehouse for SQL API statements (presigned URLs)
    pub warehouse: Option<String>,
    /// Stage holding the source documents
    pub stage: String,
    /// Presigned URL lifetime in seconds
    pub presign_expiry_secs: u64,
}

impl std::fmt::Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account_url", &self.account_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("search_service", &self.search_service)
            .field("warehouse", &self.warehouse)
            .field("stage", &self.stage)
            .field("presign_expiry_secs", &self.presign_expiry_secs)
            .finish()
    }
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            account_url: None,
            token: None,
            token_type: "PROGRAMMATIC_ACCESS_TOKEN".to_string(),
            database: None,
            schema: None,
            search_service: None,
            warehouse: None,
            stage: links::DEFAULT_STAGE.to_string(),
            presign_expiry_secs: links::PRESIGN_EXPIRY_SECS,
        }
    }
}

impl SnowflakeConfig {
    /// Dotted names of required keys that are absent or blank
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let required: [(&'static str, &Option<String>); 5] = [
            ("snowflake.account_url", &self.account_url),
            ("snowflake.token", &self.token),
            ("snowflake.database", &self.database),
            ("snowflake.schema", &self.schema),
            ("snowflake.search_service", &self.search_service),
        ];

        required
            .into_iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(key, _)| key)
            .collect()
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type: "cortex", "openai", "ollama"
    pub provider: String,
    /// Model used for answers
    pub model: String,
    /// Model used for query rewrites (defaults to `model`)
    pub rewrite_model: Option<String>,
    /// API base URL (openai/ollama; cortex uses the account URL)
    pub api_base: Option<String>,
    /// API key (openai). Never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("rewrite_model", &self.rewrite_model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "cortex".to_string(),
            model: llm::COMPLETION_MODEL.to_string(),
            rewrite_model: None,
            api_base: None,
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            max_tokens: llm::MAX_TOKENS,
        }
    }
}

// =============================================================================
// Retrieval Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum passages per query (K)
    pub num_chunks: usize,
    /// Columns requested from the search service
    pub columns: Vec<String>,
    /// Search request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            num_chunks: retrieval::NUM_CHUNKS,
            columns: retrieval::COLUMNS.iter().map(|c| c.to_string()).collect(),
            timeout_secs: retrieval::TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Chat Configuration
// =============================================================================

/// What to do when the history-aware query rewrite fails or comes back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewriteFallback {
    /// Retrieve with the user's literal question
    #[default]
    RawQuery,
    /// Fail the turn
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Number of prior turns supplied as history
    pub slide_window: usize,
    /// Whether new sessions start with history enabled
    pub use_history: bool,
    /// Category selected when a session starts
    pub default_category: Category,
    pub rewrite_fallback: RewriteFallback,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            slide_window: chat_constants::SLIDE_WINDOW,
            use_history: true,
            default_category: Category::All,
            rewrite_fallback: RewriteFallback::RawQuery,
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry::DEFAULT_MAX_RETRIES,
            base_delay_ms: retry::BASE_DELAY_MS,
            max_delay_secs: retry::MAX_DELAY_SECS,
        }
    }
}

// =============================================================================
// Evaluation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Score every answer after it is produced
    pub enabled: bool,
    /// Judge model
    pub model: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: llm::EVALUATION_MODEL.to_string(),
        }
    }
}
