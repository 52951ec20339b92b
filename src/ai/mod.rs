//! AI Integration Layer
//!
//! Provider abstraction, prompt construction, and the retrying completer
//! used for answers, query rewrites, and feedback judges.

pub mod completer;
pub mod prompt;
pub mod provider;
pub mod timeout;

pub use completer::{Completer, RetryPolicy};
pub use prompt::{Prompt, PromptBuilder, PromptSection};
pub use provider::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, SharedProvider,
    TokenUsage, create_provider,
};
pub use timeout::{TimeoutConfig, guarded, with_cancellation, with_timeout};
