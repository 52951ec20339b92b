//! Configuration Management
//!
//! Hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (<config dir>/souschef/config.toml)
//! 3. Project config (.souschef/config.toml) or an explicit file
//! 4. Environment variables (SOUSCHEF_*)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
