//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for completion retry decisions.
//!
//! ## Error Categories
//!
//! - **Transient**: Temporary server issues (retry)
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **Auth**: Authentication failures (fail fast)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Unavailable**: Service missing or misconfigured (fail)

use std::time::Duration;
use thiserror::Error;

use crate::rag::{PipelineState, TurnTrace};

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Service unavailable or endpoint not found
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Response body could not be decoded
    ParseError,
    /// Temporary server issues - retry
    Transient,
    /// Unknown error - don't retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }

    /// Get recommended retry delay for this category
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(30),
            Self::Network => Duration::from_secs(5),
            Self::Transient => Duration::from_secs(2),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Provider error with category, context, and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Suggested wait time before retry (if applicable)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    /// Get recommended retry delay
    pub fn recommended_delay(&self) -> Duration {
        self.retry_after
            .unwrap_or_else(|| self.category.recommended_delay())
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw transport failures onto error categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify HTTP status code directly
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            408 => LlmError::with_provider(ErrorCategory::Network, message, provider)
                .retry_after(Duration::from_secs(5)),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
                    .retry_after(Duration::from_secs(5))
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a non-success HTTP response, consuming its body for context
    pub async fn classify_response(response: reqwest::Response, provider: &str) -> LlmError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = format!("{} API error ({}): {}", provider, status, body.trim());
        Self::classify_http_status(status.as_u16(), &message, provider)
    }

    /// Classify a reqwest transport error
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> LlmError {
        if let Some(status) = err.status() {
            return Self::classify_http_status(status.as_u16(), &err.to_string(), provider);
        }
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return LlmError::with_provider(ErrorCategory::Network, err.to_string(), provider)
                .retry_after(Duration::from_secs(5));
        }
        if err.is_decode() || err.is_body() {
            return LlmError::with_provider(ErrorCategory::ParseError, err.to_string(), provider);
        }
        LlmError::with_provider(ErrorCategory::Unknown, err.to_string(), provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ChefError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // -------------------------------------------------------------------------
    // Service Errors
    // -------------------------------------------------------------------------
    /// Provider error with category and retry hints
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Query rewrite failed: {0}")]
    Rewrite(String),

    #[error("Completion failed after {attempts} attempt(s): {message}")]
    Completion { attempts: usize, message: String },

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Link resolution failed for {source_id}: {message}")]
    LinkResolution { source_id: String, message: String },

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// Error annotated with the pipeline state it occurred in and, when
    /// raised by a pipeline run, that run's trace
    #[error("{stage} failed: {source}")]
    Stage {
        stage: PipelineState,
        trace: Option<Box<TurnTrace>>,
        #[source]
        source: Box<ChefError>,
    },

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Cancelled")]
    Cancelled,
}

impl From<LlmError> for ChefError {
    fn from(err: LlmError) -> Self {
        ChefError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, ChefError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ChefError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Attach the pipeline state an error occurred in
    pub fn at_stage(self, stage: PipelineState) -> Self {
        match self {
            // Keep the innermost stage
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                trace: None,
                source: Box::new(other),
            },
        }
    }

    /// Attach the trace of the failed run; an existing trace is kept
    pub fn with_trace(self, run: TurnTrace) -> Self {
        match self {
            Self::Stage {
                stage,
                trace: None,
                source,
            } => Self::Stage {
                stage,
                trace: Some(Box::new(run)),
                source,
            },
            other => other,
        }
    }

    /// Trace of the failed run, if one was attached
    pub fn trace(&self) -> Option<&TurnTrace> {
        match self {
            Self::Stage { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }

    /// Pipeline state the error occurred in, if annotated
    pub fn stage(&self) -> Option<PipelineState> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, skipping stage annotations
    pub fn root(&self) -> &ChefError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is worth another attempt
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            Self::Stage { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Minimum wait before the next attempt, from provider hints
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::Llm(e) => Some(e.recommended_delay()),
            Self::Stage { source, .. } => source.retry_hint(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
        assert_eq!(ErrorCategory::Transient.to_string(), "TRANSIENT");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::Unknown.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "cortex");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);
        assert_eq!(rate_limit.retry_after, Some(Duration::from_secs(30)));

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "cortex");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let server_error = ErrorClassifier::classify_http_status(503, "Overloaded", "cortex");
        assert_eq!(server_error.category, ErrorCategory::Transient);

        let missing = ErrorClassifier::classify_http_status(404, "No such model", "openai");
        assert_eq!(missing.category, ErrorCategory::Unavailable);
    }

    #[test]
    fn test_recommended_delay() {
        let network = LlmError::new(ErrorCategory::Network, "test");
        assert_eq!(network.recommended_delay(), Duration::from_secs(5));

        let custom =
            LlmError::new(ErrorCategory::Unknown, "test").retry_after(Duration::from_secs(100));
        assert_eq!(custom.recommended_delay(), Duration::from_secs(100));
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_stage_annotation_keeps_innermost() {
        let err = ChefError::Retrieval("connection reset".into())
            .at_stage(PipelineState::Retrieving)
            .at_stage(PipelineState::Completing);

        assert_eq!(err.stage(), Some(PipelineState::Retrieving));
        assert!(matches!(err.root(), ChefError::Retrieval(_)));
    }

    #[test]
    fn test_recoverable_through_stage() {
        let transient = ChefError::Llm(LlmError::new(ErrorCategory::Transient, "busy"))
            .at_stage(PipelineState::Completing);
        assert!(transient.is_recoverable());

        let auth = ChefError::Llm(LlmError::new(ErrorCategory::Auth, "bad token"));
        assert!(!auth.is_recoverable());

        assert!(ChefError::timeout("search", Duration::from_secs(1)).is_recoverable());
        assert!(!ChefError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_retry_hint() {
        let rate_limited: ChefError =
            ErrorClassifier::classify_http_status(429, "slow down", "cortex").into();
        assert_eq!(rate_limited.retry_hint(), Some(Duration::from_secs(30)));

        let staged = rate_limited.at_stage(PipelineState::Completing);
        assert_eq!(staged.retry_hint(), Some(Duration::from_secs(30)));

        assert_eq!(ChefError::timeout("search", Duration::from_secs(1)).retry_hint(), None);
    }

    #[test]
    fn test_is_cancelled_through_stage() {
        let err = ChefError::Cancelled.at_stage(PipelineState::Rewriting);
        assert!(err.is_cancelled());
        assert!(!ChefError::Rewrite("empty".into()).is_cancelled());
    }
}
