//! Config Command
//!
//! Manage souschef configuration.
//!
//! Usage:
//!   souschef config show [-f json|yaml|text]
//!   souschef config path
//!   souschef config init [--force]

use std::path::Path;

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective configuration (merged from all sources, secrets omitted)
pub fn show(config_path: Option<&Path>, format: &str) -> Result<()> {
    let config = ConfigLoader::load_unvalidated(config_path)?;
    println!("{}", ConfigLoader::render(&config, format)?);

    let missing = config.snowflake.missing_keys();
    if !missing.is_empty() {
        eprintln!("\n# Missing required keys: {}", missing.join(", "));
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize project configuration
pub fn init(force: bool) -> Result<()> {
    let config_path = ConfigLoader::init_project(force)?;
    println!("✓ Initialized project configuration");
    println!("  Config: {}", config_path.display());
    println!("  Set SOUSCHEF_SNOWFLAKE__TOKEN to supply the access token.");
    Ok(())
}
