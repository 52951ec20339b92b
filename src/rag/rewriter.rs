//! Query Rewriter
//!
//! Turns a context-dependent follow-up into a standalone search query.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::prompt::RewritePromptBuilder;
use crate::ai::completer::Completer;
use crate::chat::Turn;
use crate::types::{ChefError, Result};

#[derive(Debug, Clone)]
pub struct QueryRewriter {
    completer: Completer,
}

impl QueryRewriter {
    pub fn new(completer: Completer) -> Self {
        Self { completer }
    }

    /// Rewrite `question` using `history`.
    ///
    /// Failures and empty output surface as `ChefError::Rewrite`;
    /// the caller decides whether to fall back.
    pub async fn rewrite(
        &self,
        history: &[Turn],
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let prompt = RewritePromptBuilder::build(history, question);

        let raw = self
            .completer
            .complete(prompt.as_str(), cancel)
            .await
            .map_err(|err| match err {
                ChefError::Cancelled => ChefError::Cancelled,
                other => ChefError::Rewrite(other.to_string()),
            })?;

        let rewritten = strip_quotes(&raw);
        if rewritten.is_empty() {
            return Err(ChefError::Rewrite("model returned an empty query".into()));
        }

        debug!(original = %question, rewritten = %rewritten, "Rewrote query");
        Ok(rewritten)
    }
}

fn strip_quotes(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\'' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}
