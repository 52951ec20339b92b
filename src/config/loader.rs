//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (<config dir>/souschef/config.toml)
//! 3. Project config (.souschef/config.toml), or an explicit `--config` file
//! 4. Environment variables (SOUSCHEF_* prefix, `__` between sections)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ChefError, Result};

/// Environment variable prefix (e.g. SOUSCHEF_SNOWFLAKE__ACCOUNT_URL -> snowflake.account_url)
pub const ENV_PREFIX: &str = "SOUSCHEF_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain and validate it.
    ///
    /// A missing required key is a startup failure.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let config = Self::load_unvalidated(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration without validation (for `config show`)
    pub fn load_unvalidated(explicit: Option<&Path>) -> Result<Config> {
        Self::figment(explicit)
            .extract()
            .map_err(|e| ChefError::Config(format!("Configuration error: {}", e)))
    }

    /// Build the merged figment: defaults → global → project/explicit → env
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        match explicit {
            Some(path) => {
                debug!("Loading config from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let project_path = Self::project_config_path();
                if project_path.exists() {
                    debug!("Loading project config from: {}", project_path.display());
                    figment = figment.merge(Toml::file(&project_path));
                }
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "souschef").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".souschef")
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration (secrets are never serialized)
    pub fn render(config: &Config, format: &str) -> Result<String> {
        match format {
            "json" => Ok(serde_json::to_string_pretty(config)?),
            "yaml" => Ok(serde_yaml::to_string(config)?),
            _ => toml::to_string_pretty(config).map_err(|e| ChefError::Config(e.to_string())),
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a project config template, returning its path
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir();
        fs::create_dir_all(&project_dir)?;

        let config_path = Self::project_config_path();
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Default project config content (TOML)
    pub fn default_project_config() -> String {
        r#"# souschef configuration
# Secrets can be supplied through the environment instead:
#   SOUSCHEF_SNOWFLAKE__TOKEN, SOUSCHEF_LLM__API_KEY

version = "1.0"

[snowflake]
account_url = "https://<org>-<account>.snowflakecomputing.com"
# token = "<programmatic access token>"
token_type = "PROGRAMMATIC_ACCESS_TOKEN"
database = "CC_QUICKSTART_CORTEX_SEARCH_DOCS"
schema = "DATA"
search_service = "CC_SEARCH_SERVICE_CS"
stage = "@DOCS"

[llm]
provider = "cortex"
model = "mistral-large"

[retrieval]
num_chunks = 3

[chat]
slide_window = 7
use_history = true
default_category = "ALL"
rewrite_fallback = "raw_query"

[evaluation]
enabled = false
model = "mistral-large2"
"#
        .to_string()
    }
}
