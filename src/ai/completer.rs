//! Completer
//!
//! Sends a finished prompt to the configured provider and returns the
//! generated text. Transient failures (network, rate limit, 5xx, per-attempt
//! timeout) are retried with jittered exponential backoff, waiting at least as
//! long as the provider's retry hint; anything else, or exhaustion, surfaces as
//! `ChefError::Completion`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ai::provider::SharedProvider;
use crate::ai::timeout::{with_cancellation, with_timeout};
use crate::config::RetryConfig;
use crate::constants::retry as retry_constants;
use crate::types::{ChefError, Result};

/// Backoff settings for completion retries
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::MAX_DELAY_SECS),
            factor: retry_constants::BACKOFF_FACTOR,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
            ..Self::default()
        }
    }
}

impl RetryPolicy {
    /// No retries; used where a second attempt is never useful
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    /// Stretch a backoff delay to the error's retry hint, capped at `max_delay`
    pub fn adjust_delay(&self, err: &ChefError, backoff: Option<Duration>) -> Option<Duration> {
        let delay = backoff?;
        Some(match err.retry_hint() {
            Some(hint) => delay.max(hint.min(self.max_delay)),
            None => delay,
        })
    }
}

/// Completion call with bounded retry, per-attempt timeout, and cancellation
#[derive(Clone)]
pub struct Completer {
    provider: SharedProvider,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl std::fmt::Debug for Completer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer")
            .field("provider", &self.provider.name())
            .field("model", &self.provider.model())
            .field("policy", &self.policy)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

impl Completer {
    pub fn new(provider: SharedProvider, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            provider,
            policy,
            attempt_timeout,
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Complete `prompt`, returning the generated text.
    pub async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        let counter = AtomicUsize::new(0);
        let counter_ref = &counter;
        let provider_name = self.provider.name();

        let attempt = move || async move {
            let n = counter_ref.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(provider = %provider_name, attempt = n, "Completion attempt");
            with_timeout(
                self.attempt_timeout,
                self.provider.generate(prompt),
                "completion request",
            )
            .await
        };

        let retried = attempt
            .retry(self.policy.backoff())
            .sleep(tokio::time::sleep)
            .when(|err: &ChefError| err.is_recoverable())
            .adjust(|err: &ChefError, backoff| self.policy.adjust_delay(err, backoff))
            .notify(|err: &ChefError, delay: Duration| {
                warn!(
                    provider = %provider_name,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Completion failed, retrying"
                );
            });

        let result = with_cancellation(cancel, retried).await;
        let attempts = counter.load(Ordering::SeqCst);

        match result {
            Ok(response) => {
                debug!(
                    provider = %provider_name,
                    attempts,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    total_ms = response.timing.total_ms,
                    "Completion succeeded"
                );
                let text = response.content.trim().to_string();
                if text.is_empty() {
                    return Err(ChefError::Completion {
                        attempts,
                        message: "provider returned empty text".to_string(),
                    });
                }
                Ok(text)
            }
            Err(ChefError::Cancelled) => Err(ChefError::Cancelled),
            Err(err) => Err(ChefError::Completion {
                attempts,
                message: err.to_string(),
            }),
        }
    }
}
