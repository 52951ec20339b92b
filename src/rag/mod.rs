//! Retrieval-Augmented Answering
//!
//! Per-turn pipeline: window the history, optionally rewrite the question,
//! retrieve passages, build the persona prompt, and complete it.

mod pipeline;
mod prompt;
mod rewriter;
mod state;

pub use pipeline::{PipelineOutcome, QueryPipeline, StageTiming, TurnTrace};
pub use prompt::{AnswerPromptBuilder, RewritePromptBuilder, render_history};
pub use rewriter::QueryRewriter;
pub use state::PipelineState;
