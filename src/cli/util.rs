//! CLI Common Utilities
//!
//! Wires configuration into the shared service handles used by commands.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::ai::completer::{Completer, RetryPolicy};
use crate::ai::provider::{ProviderConfig, SharedProvider, create_provider};
use crate::ai::timeout::TimeoutConfig;
use crate::chat::HistoryMode;
use crate::config::{Config, ConfigLoader};
use crate::eval::Evaluator;
use crate::links::{SharedLinkResolver, StageLinkResolver};
use crate::rag::{QueryPipeline, QueryRewriter};
use crate::search::{CortexSearchService, Retriever, SharedSearch};
use crate::snowflake::SnowflakeClient;
use crate::types::{Category, ChefError, Result};

/// Command execution context
///
/// Built once at startup; every handle is stateless and shared by sessions.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub pipeline: QueryPipeline,
    pub evaluator: Evaluator,
    pub links: SharedLinkResolver,
}

impl AppContext {
    /// Load and validate configuration, then build the service handles
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = ConfigLoader::load(config_path)?;
        Self::build(config)
    }

    pub fn build(config: Config) -> Result<Self> {
        let timeouts = TimeoutConfig::from_config(&config);
        let policy = RetryPolicy::from(&config.retry);
        let client = SnowflakeClient::new(&config.snowflake, timeouts.completion)?;

        let service = config
            .snowflake
            .search_service
            .clone()
            .ok_or_else(|| ChefError::Config("snowflake.search_service is required".into()))?;
        let search: SharedSearch = Arc::new(CortexSearchService::new(client.clone(), service));
        let retriever = Retriever::new(search, &config.retrieval);

        let provider_for = |model: &str| -> Result<SharedProvider> {
            create_provider(&ProviderConfig::from_llm(&config.llm, model), &client)
        };
        let completer_for = |model: &str| -> Result<Completer> {
            Ok(Completer::new(
                provider_for(model)?,
                policy.clone(),
                timeouts.completion,
            ))
        };

        let rewrite_model = config
            .llm
            .rewrite_model
            .as_deref()
            .unwrap_or(&config.llm.model);

        let pipeline = QueryPipeline::new(
            retriever,
            QueryRewriter::new(completer_for(rewrite_model)?),
            completer_for(&config.llm.model)?,
            config.chat.rewrite_fallback,
        );
        let evaluator = Evaluator::new(completer_for(&config.evaluation.model)?)?;
        let links: SharedLinkResolver =
            Arc::new(StageLinkResolver::new(client.clone(), &config.snowflake)?);

        debug!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            rewrite_model,
            "Built query pipeline"
        );

        Ok(Self {
            config,
            pipeline,
            evaluator,
            links,
        })
    }

    /// Category from a CLI flag, else the configured default
    pub fn category(&self, flag: Option<Category>) -> Category {
        flag.unwrap_or(self.config.chat.default_category)
    }

    /// History mode from configuration, overridden off by `--no-history`
    pub fn history_mode(&self, no_history: bool) -> HistoryMode {
        HistoryMode::from_flag(
            self.config.chat.use_history && !no_history,
            self.config.chat.slide_window,
        )
    }

    pub fn evaluate_by_default(&self) -> bool {
        self.config.evaluation.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnowflakeConfig;

    fn config() -> Config {
        Config {
            snowflake: SnowflakeConfig {
                account_url: Some("https://acme.snowflakecomputing.com".into()),
                token: Some("t".into()),
                database: Some("DB".into()),
                schema: Some("DATA".into()),
                search_service: Some("SVC".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_build_wires_defaults() {
        let ctx = AppContext::build(config()).unwrap();
        assert_eq!(ctx.category(None), Category::All);
        assert_eq!(ctx.category(Some(Category::Salads)), Category::Salads);
        assert_eq!(ctx.history_mode(false), HistoryMode::Enabled { window: 7 });
        assert_eq!(ctx.history_mode(true), HistoryMode::Disabled);
        assert!(!ctx.evaluate_by_default());
    }

    #[test]
    fn test_build_rejects_unknown_provider() {
        let mut cfg = config();
        cfg.llm.provider = "bard".into();
        assert!(matches!(
            AppContext::build(cfg),
            Err(ChefError::Config(_))
        ));
    }
}
