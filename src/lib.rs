//! souschef - Conversational Recipe Assistant
//!
//! Answers cooking questions from a curated recipe collection using
//! retrieval-augmented generation over Snowflake Cortex.
//!
//! ## Turn Flow
//!
//! 1. The question is appended to the session's conversation store
//! 2. Recent history is windowed and, when present, used to rewrite the
//!    question into a standalone search query
//! 3. Passages are retrieved (optionally filtered by category)
//! 4. A persona prompt is built and completed
//! 5. The answer is appended and related recipe documents are linked
//!
//! ## Quick Start
//!
//! ```ignore
//! use souschef::{AppContext, ChatSession, HistoryMode, Category};
//!
//! let ctx = AppContext::load(None)?;
//! let mut session = ChatSession::new(Category::MainCourse, HistoryMode::Enabled { window: 7 });
//! let outcome = session.submit(&ctx.pipeline, "I have chicken and rice", &cancel).await?;
//! println!("{}", outcome.answer);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: LLM providers, prompt builder, retrying completer
//! - [`chat`]: conversation store, history window, sessions
//! - [`search`]: search service boundary and retriever
//! - [`rag`]: query pipeline state machine
//! - [`eval`]: LLM-judged feedback scores
//! - [`links`]: presigned document links

pub mod ai;
pub mod chat;
pub mod cli;
pub mod config;
pub mod constants;
pub mod eval;
pub mod links;
pub mod rag;
pub mod search;
pub mod snowflake;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, RewriteFallback};

// Error Types
pub use types::{Category, ChefError, ErrorCategory, Result};

// Chat
pub use chat::{ChatSession, ConversationStore, HistoryMode, Role, Turn};

// Pipeline
pub use rag::{PipelineOutcome, PipelineState, QueryPipeline, TurnTrace};

// Services
pub use ai::{Completer, LlmProvider, TimeoutConfig};
pub use cli::AppContext;
pub use eval::{Evaluator, FeedbackScores};
pub use links::{DocumentLink, LinkResolver, resolve_links};
pub use search::{Passage, RetrievalResult, Retriever, SearchService};
