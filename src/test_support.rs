//! Test doubles for the LLM and search boundaries

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::ai::completer::RetryPolicy;
use crate::ai::provider::{LlmProvider, LlmResponse};
use crate::search::{SearchRecord, SearchRequest, SearchResponse, SearchService};
use crate::types::{ErrorCategory, LlmError, Result};

/// Retry policy with millisecond delays
pub fn fast_policy(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        factor: 1.0,
    }
}

/// Scripted LLM provider
pub struct MockLlm {
    replies: Vec<String>,
    fail_first: usize,
    fail_category: ErrorCategory,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Replies in order, repeating the last one once exhausted
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            fail_first: 0,
            fail_category: ErrorCategory::Transient,
            delay: None,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an auth error
    pub fn unauthorized() -> Self {
        Self {
            fail_first: usize::MAX,
            fail_category: ErrorCategory::Auth,
            ..Self::replying(Vec::<String>::new())
        }
    }

    /// First `n` calls fail with a transient error
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// First `n` calls are rate limited
    pub fn rate_limited_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self.fail_category = ErrorCategory::RateLimit;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if n < self.fail_first {
            return Err(LlmError::with_provider(self.fail_category, "scripted failure", "mock").into());
        }

        let index = (n - self.fail_first).min(self.replies.len().saturating_sub(1));
        let reply = self.replies.get(index).cloned().unwrap_or_default();
        Ok(LlmResponse::content_only(reply))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Scripted search service
pub struct MockSearch {
    records: Vec<SearchRecord>,
    fail: bool,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MockSearch {
    /// Returns the given records; non-object values are skipped
    pub fn returning(records: Vec<Value>) -> Self {
        Self {
            records: records
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            fail: false,
            delay: None,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    /// Every call fails with a network error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    /// Stall every call before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchService for MockSearch {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(LlmError::with_provider(
                ErrorCategory::Network,
                "connection reset by peer",
                "mock-search",
            )
            .into());
        }

        Ok(SearchResponse {
            results: self.records.clone(),
        })
    }

    fn name(&self) -> &str {
        "mock-search"
    }
}
