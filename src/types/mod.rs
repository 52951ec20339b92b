pub mod category;
pub mod error;

pub use category::Category;
pub use error::{ChefError, ErrorCategory, ErrorClassifier, LlmError, Result};
