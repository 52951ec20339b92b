//! Search Service Abstraction
//!
//! Boundary to the external passage search service. Implementations return
//! raw records; `Retriever` validates and coerces them into passages.

mod cortex;
mod retriever;

pub use cortex::CortexSearchService;
pub use retriever::{Passage, RetrievalResult, Retriever};

use async_trait::async_trait;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::types::Result;

/// One raw search record keyed by column name
pub type SearchRecord = Map<String, Value>;

/// Shared search handle; stateless, safe to share across sessions.
pub type SharedSearch = Arc<dyn SearchService + Send + Sync>;

/// Single-field filter predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    /// `{"@eq": {field: value}}`
    Eq { field: String, value: String },
}

impl SearchFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        SearchFilter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl Serialize for SearchFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SearchFilter::Eq { field, value } => {
                let mut inner = Map::new();
                inner.insert(field.clone(), Value::String(value.clone()));
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("@eq", &inner)?;
                map.end()
            }
        }
    }
}

/// Search request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchFilter>,
    pub limit: usize,
}

/// Search response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchRecord>,
}

/// Passage search service
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// Service name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_serializes_as_eq_predicate() {
        let filter = SearchFilter::eq("category", "Desserts");
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"@eq": {"category": "Desserts"}})
        );
    }

    #[test]
    fn test_request_omits_absent_filter() {
        let request = SearchRequest {
            query: "pancakes".into(),
            columns: vec!["chunk".into()],
            filter: None,
            limit: 3,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("filter").is_none());
        assert_eq!(value["limit"], 3);
    }

    #[test]
    fn test_response_tolerates_missing_results() {
        let response: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.results.is_empty());
    }
}
