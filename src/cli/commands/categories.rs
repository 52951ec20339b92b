//! Categories Command
//!
//! List the recipe categories accepted by `--category` and `/category`.

use crate::types::{Category, Result};

pub fn run() -> Result<()> {
    println!("Recipe categories:");
    for category in Category::CONCRETE {
        println!("  {}", category);
    }
    println!("  {} (no filter, default)", Category::All);
    Ok(())
}
