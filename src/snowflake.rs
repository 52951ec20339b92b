//! Snowflake REST Client
//!
//! Shared HTTP handle for the Cortex Search, Cortex inference, and SQL
//! statement endpoints. Holds the bearer token as a `SecretString`.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::warn;

use crate::config::SnowflakeConfig;
use crate::constants::network;
use crate::types::{ChefError, Result};

/// Authenticated client for one Snowflake account
#[derive(Clone)]
pub struct SnowflakeClient {
    account_url: String,
    token: SecretString,
    token_type: String,
    database: String,
    schema: String,
    warehouse: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for SnowflakeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeClient")
            .field("account_url", &self.account_url)
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("warehouse", &self.warehouse)
            .finish()
    }
}

impl SnowflakeClient {
    /// Build from validated configuration.
    pub fn new(config: &SnowflakeConfig, timeout: Duration) -> Result<Self> {
        let missing = config.missing_keys();
        if !missing.is_empty() {
            return Err(ChefError::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )));
        }

        let require = |value: &Option<String>| value.clone().unwrap_or_default();
        let account_url = Self::validate_account_url(&require(&config.account_url))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChefError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            account_url,
            token: SecretString::from(require(&config.token)),
            token_type: config.token_type.clone(),
            database: require(&config.database),
            schema: require(&config.schema),
            warehouse: config.warehouse.clone(),
            http,
        })
    }

    /// Only https (or http for local proxies) account URLs, without trailing slash
    fn validate_account_url(raw: &str) -> Result<String> {
        let url = url::Url::parse(raw).map_err(|e| {
            ChefError::Config(format!("Invalid snowflake.account_url '{}': {}", raw, e))
        })?;

        match url.scheme() {
            "https" => {}
            "http" => warn!("snowflake.account_url uses plain http: {}", raw),
            other => {
                return Err(ChefError::Config(format!(
                    "snowflake.account_url must use https, got: {}",
                    other
                )));
            }
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn warehouse(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }

    /// Absolute URL for an API path such as `/api/v2/statements`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.account_url, path)
    }

    /// POST request with auth headers applied
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.endpoint(path))
            .bearer_auth(self.token.expose_secret())
            .header("X-Snowflake-Authorization-Token-Type", &self.token_type)
            .header("Accept", "application/json")
    }
}
