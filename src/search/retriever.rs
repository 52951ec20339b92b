//! Retriever
//!
//! Runs one search per turn and coerces the raw records into passages.
//! Results are capped at K regardless of what the service returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{SearchFilter, SearchRecord, SearchRequest, SharedSearch};
use crate::ai::timeout::guarded;
use crate::config::RetrievalConfig;
use crate::constants::retrieval::{CATEGORY_COLUMN, CHUNK_COLUMN, PATH_COLUMN};
use crate::types::{Category, ChefError, Result};

/// Retrieved text chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    /// Relative path of the source document, when the record carried one
    pub source_id: Option<String>,
    pub category: Category,
}

/// Passages for one query plus their distinct source ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub passages: Vec<Passage>,
    pub source_ids: BTreeSet<String>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn from_passages(passages: Vec<Passage>) -> Self {
        let source_ids = passages
            .iter()
            .filter_map(|p| p.source_id.clone())
            .collect();
        Self {
            passages,
            source_ids,
        }
    }
}

/// Category-filtered passage search with a result cap
#[derive(Clone)]
pub struct Retriever {
    search: SharedSearch,
    limit: usize,
    columns: Vec<String>,
    timeout: Duration,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("search", &self.search.name())
            .field("limit", &self.limit)
            .field("columns", &self.columns)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Retriever {
    pub fn new(search: SharedSearch, config: &RetrievalConfig) -> Self {
        Self {
            search,
            limit: config.num_chunks,
            columns: config.columns.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Override the per-request search timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Search request for `query`; `ALL` means no filter
    pub fn request(&self, query: &str, category: Category) -> SearchRequest {
        let filter = (!category.is_wildcard())
            .then(|| SearchFilter::eq(CATEGORY_COLUMN, category.as_str()));

        SearchRequest {
            query: query.to_string(),
            columns: self.columns.clone(),
            filter,
            limit: self.limit,
        }
    }

    /// Retrieve at most K passages for `query`.
    ///
    /// Zero matches is an empty result. Transport and service failures
    /// surface as `ChefError::Retrieval`.
    pub async fn retrieve(
        &self,
        query: &str,
        category: Category,
        cancel: &CancellationToken,
    ) -> Result<RetrievalResult> {
        let request = self.request(query, category);

        let response = guarded(
            self.timeout,
            cancel,
            self.search.search(&request),
            "search request",
        )
        .await
        .map_err(|err| match err {
            ChefError::Cancelled => ChefError::Cancelled,
            other => ChefError::Retrieval(other.to_string()),
        })?;

        let reported = response.results.len();
        let passages: Vec<Passage> = response
            .results
            .iter()
            .filter_map(coerce_record)
            .take(self.limit)
            .collect();

        if passages.len() < reported.min(self.limit) {
            warn!(
                reported,
                kept = passages.len(),
                "Dropped search records without passage text"
            );
        }
        debug!(
            category = %category,
            passages = passages.len(),
            "Retrieved passages"
        );

        Ok(RetrievalResult::from_passages(passages))
    }
}

/// Validate one raw record. Records without passage text are dropped.
fn coerce_record(record: &SearchRecord) -> Option<Passage> {
    let text = scalar_text(record.get(CHUNK_COLUMN)?)?;

    let source_id = record
        .get(PATH_COLUMN)
        .and_then(scalar_text)
        .filter(|s| !s.is_empty());

    let category = record
        .get(CATEGORY_COLUMN)
        .and_then(scalar_text)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();

    Some(Passage {
        text,
        source_id,
        category,
    })
}

/// Strings pass through; other scalars are stringified; null and containers are rejected
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
