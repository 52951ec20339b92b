//! Snowflake Cortex Search Service
//!
//! `POST /api/v2/databases/{db}/schemas/{schema}/cortex-search-services/{svc}:query`

use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

use super::{SearchRequest, SearchResponse, SearchService};
use crate::snowflake::SnowflakeClient;
use crate::types::{ErrorClassifier, Result};

const SERVICE: &str = "cortex-search";

/// Cortex Search service bound to one account
#[derive(Debug, Clone)]
pub struct CortexSearchService {
    client: SnowflakeClient,
    service: String,
}

impl CortexSearchService {
    pub fn new(client: SnowflakeClient, service: impl Into<String>) -> Self {
        Self {
            client,
            service: service.into(),
        }
    }

    fn query_path(&self) -> String {
        format!(
            "/api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
            self.client.database(),
            self.client.schema(),
            self.service
        )
    }
}

#[async_trait]
impl SearchService for CortexSearchService {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let start = Instant::now();

        let response = self
            .client
            .post(&self.query_path())
            .json(request)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, SERVICE))?;

        if !response.status().is_success() {
            return Err(ErrorClassifier::classify_response(response, SERVICE)
                .await
                .into());
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e, SERVICE))?;

        debug!(
            service = %self.service,
            results = body.results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(body)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}
