//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retrieval constants
pub mod retrieval {
    /// Number of chunks to retrieve per query
    pub const NUM_CHUNKS: usize = 3;

    /// Columns requested from the search service
    pub const COLUMNS: [&str; 3] = ["chunk", "relative_path", "category"];

    /// Column holding the passage text
    pub const CHUNK_COLUMN: &str = "chunk";

    /// Column holding the source document path
    pub const PATH_COLUMN: &str = "relative_path";

    /// Column holding the category tag (also the filter field)
    pub const CATEGORY_COLUMN: &str = "category";

    /// Search request timeout (seconds)
    pub const TIMEOUT_SECS: u64 = 30;
}

/// Conversation constants
pub mod chat {
    /// Number of prior turns supplied as history
    pub const SLIDE_WINDOW: usize = 7;

    /// Seeded assistant turn after a reset
    pub const WELCOME_MESSAGE: &str = "Hi! I'm Ali, your personal chef friend! Tell me what ingredients you have, and I'll help you whip up something delicious! 👨‍🍳";
}

/// LLM constants
pub mod llm {
    /// Model used for answers and query rewrites
    pub const COMPLETION_MODEL: &str = "mistral-large";

    /// Model used by the feedback judges
    pub const EVALUATION_MODEL: &str = "mistral-large2";

    /// Maximum tokens to generate
    pub const MAX_TOKENS: usize = 4096;
}

/// Completion retry constants
pub mod retry {
    /// Default maximum retries after the first attempt
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Document link constants
pub mod links {
    /// Stage holding the uploaded recipe documents
    pub const DEFAULT_STAGE: &str = "@DOCS";

    /// Presigned URL lifetime (seconds)
    pub const PRESIGN_EXPIRY_SECS: u64 = 360;
}

/// HTTP/Network constants
pub mod network {
    /// Default completion request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// SQL API statement timeout (seconds)
    pub const STATEMENT_TIMEOUT_SECS: u64 = 60;
}
