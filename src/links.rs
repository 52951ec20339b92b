//! Document Links
//!
//! Resolves stored recipe document ids into time-limited presigned URLs.
//! A failed resolution falls back to the bare id.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ai::timeout::with_cancellation;
use crate::config::SnowflakeConfig;
use crate::constants::network::STATEMENT_TIMEOUT_SECS;
use crate::snowflake::SnowflakeClient;
use crate::types::{ChefError, Result};

const STATEMENTS_PATH: &str = "/api/v2/statements";

/// Resolved link for one source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub source_id: String,
    /// Presigned URL; `None` when resolution failed
    pub url: Option<String>,
}

impl fmt::Display for DocumentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "Recipe: [{}]({})", self.source_id, url),
            None => write!(f, "Recipe: {}", self.source_id),
        }
    }
}

/// Maps a document id to a signed URL
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, source_id: &str) -> Result<String>;
}

pub type SharedLinkResolver = Arc<dyn LinkResolver + Send + Sync>;

/// Resolve every id concurrently, falling back to the bare id on failure
pub async fn resolve_links(
    resolver: &dyn LinkResolver,
    source_ids: &BTreeSet<String>,
    cancel: &CancellationToken,
) -> Vec<DocumentLink> {
    let lookups = source_ids.iter().map(|source_id| async move {
        let url = match with_cancellation(cancel, resolver.resolve(source_id)).await {
            Ok(url) => Some(url),
            Err(ChefError::Cancelled) => None,
            Err(err) => {
                warn!(source_id = %source_id, error = %err, "Link resolution failed");
                None
            }
        };
        DocumentLink {
            source_id: source_id.clone(),
            url,
        }
    });

    join_all(lookups).await
}

/// Presigned URLs minted through the SQL statements API
#[derive(Debug, Clone)]
pub struct StageLinkResolver {
    client: SnowflakeClient,
    stage: String,
    expiry_secs: u64,
}

impl StageLinkResolver {
    pub fn new(client: SnowflakeClient, config: &SnowflakeConfig) -> Result<Self> {
        validate_stage(&config.stage)?;
        Ok(Self {
            client,
            stage: config.stage.clone(),
            expiry_secs: config.presign_expiry_secs,
        })
    }

    fn statement(&self) -> String {
        format!(
            "SELECT GET_PRESIGNED_URL({}, ?, {}) AS URL_LINK",
            self.stage, self.expiry_secs
        )
    }

    fn request_body(&self, source_id: &str) -> Value {
        let mut body = json!({
            "statement": self.statement(),
            "timeout": STATEMENT_TIMEOUT_SECS,
            "database": self.client.database(),
            "schema": self.client.schema(),
            "bindings": {
                "1": {"type": "TEXT", "value": source_id}
            }
        });
        if let (Some(warehouse), Some(map)) = (self.client.warehouse(), body.as_object_mut()) {
            map.insert("warehouse".into(), Value::String(warehouse.to_string()));
        }
        body
    }
}

#[async_trait]
impl LinkResolver for StageLinkResolver {
    async fn resolve(&self, source_id: &str) -> Result<String> {
        let failure = |message: String| ChefError::LinkResolution {
            source_id: source_id.to_string(),
            message,
        };

        let response = self
            .client
            .post(STATEMENTS_PATH)
            .json(&self.request_body(source_id))
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failure(format!("SQL API error ({}): {}", status, body.trim())));
        }

        let body: StatementResponse = response.json().await.map_err(|e| failure(e.to_string()))?;
        let url = body.first_cell().ok_or_else(|| failure("empty result set".into()))?;

        debug!(source_id = %source_id, "Resolved presigned URL");
        Ok(url)
    }
}

/// Stage names are interpolated into SQL, so only plain identifiers pass
fn validate_stage(stage: &str) -> Result<()> {
    let name = stage.strip_prefix('@').unwrap_or_default();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'));

    if valid {
        Ok(())
    } else {
        Err(ChefError::Config(format!(
            "snowflake.stage must look like @NAME, got: {}",
            stage
        )))
    }
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

impl StatementResponse {
    fn first_cell(self) -> Option<String> {
        self.data
            .into_iter()
            .next()?
            .into_iter()
            .next()?
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MapResolver(HashMap<String, String>);

    #[async_trait]
    impl LinkResolver for MapResolver {
        async fn resolve(&self, source_id: &str) -> Result<String> {
            self.0
                .get(source_id)
                .cloned()
                .ok_or_else(|| ChefError::LinkResolution {
                    source_id: source_id.into(),
                    message: "not found".into(),
                })
        }
    }

    fn config() -> SnowflakeConfig {
        SnowflakeConfig {
            account_url: Some("https://acme.snowflakecomputing.com".into()),
            token: Some("t".into()),
            database: Some("DB".into()),
            schema: Some("DATA".into()),
            search_service: Some("SVC".into()),
            warehouse: Some("COMPUTE_WH".into()),
            ..Default::default()
        }
    }

    fn resolver() -> StageLinkResolver {
        let cfg = config();
        let client = SnowflakeClient::new(&cfg, Duration::from_secs(5)).unwrap();
        StageLinkResolver::new(client, &cfg).unwrap()
    }

    #[test]
    fn test_statement_uses_stage_and_expiry() {
        assert_eq!(
            resolver().statement(),
            "SELECT GET_PRESIGNED_URL(@DOCS, ?, 360) AS URL_LINK"
        );
    }

    #[test]
    fn test_request_binds_source_id() {
        let body = resolver().request_body("cake's recipe.pdf");
        assert_eq!(body["bindings"]["1"]["value"], "cake's recipe.pdf");
        assert_eq!(body["warehouse"], "COMPUTE_WH");
        assert_eq!(body["database"], "DB");
    }

    #[test]
    fn test_rejects_suspicious_stage() {
        assert!(validate_stage("@DOCS").is_ok());
        assert!(validate_stage("@DB.DATA.DOCS").is_ok());
        assert!(validate_stage("DOCS").is_err());
        assert!(validate_stage("@DOCS); DROP TABLE x; --").is_err());
    }

    #[test]
    fn test_first_cell() {
        let body: StatementResponse =
            serde_json::from_value(json!({"data": [["https://signed"]]})).unwrap();
        assert_eq!(body.first_cell().as_deref(), Some("https://signed"));

        let empty: StatementResponse = serde_json::from_value(json!({"data": []})).unwrap();
        assert_eq!(empty.first_cell(), None);
    }

    #[tokio::test]
    async fn test_resolve_links_falls_back_to_bare_id() {
        let resolver = MapResolver(HashMap::from([(
            "cake.pdf".to_string(),
            "https://signed/cake".to_string(),
        )]));
        let ids = BTreeSet::from(["cake.pdf".to_string(), "pie.pdf".to_string()]);

        let links = resolve_links(&resolver, &ids, &CancellationToken::new()).await;

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url.as_deref(), Some("https://signed/cake"));
        assert_eq!(links[1].url, None);
        assert_eq!(links[1].to_string(), "Recipe: pie.pdf");
        assert_eq!(links[0].to_string(), "Recipe: [cake.pdf](https://signed/cake)");
    }
}
