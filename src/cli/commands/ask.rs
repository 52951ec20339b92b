//! Ask Command
//!
//! One-shot question against an empty conversation.
//!
//! Usage:
//!   souschef ask "I have chicken and rice" [--category MainCourse]

use tokio_util::sync::CancellationToken;

use super::chat::{ctrl_c, interruptible, present, report};
use crate::chat::{ChatSession, HistoryMode};
use crate::cli::AppContext;
use crate::cli::ui::Output;
use crate::types::{Category, ChefError, Result};

/// Parse a question argument, rejecting blank input
pub fn parse_query(s: &str) -> std::result::Result<String, String> {
    let query = s.trim();
    if query.is_empty() {
        return Err("question must not be empty".to_string());
    }
    Ok(query.to_string())
}

pub async fn run(
    ctx: &AppContext,
    query: &str,
    category: Option<Category>,
    show_trace: bool,
    evaluate: bool,
) -> Result<()> {
    let out = Output::new();
    let query = parse_query(query).map_err(ChefError::InvalidInput)?;

    let mut session = ChatSession::blank(ctx.category(category), HistoryMode::Disabled);
    let cancel = CancellationToken::new();

    interruptible(ctrl_c(), &cancel, async {
        match session.submit(&ctx.pipeline, &query, &cancel).await {
            Ok(outcome) => {
                present(
                    ctx,
                    &out,
                    &outcome,
                    show_trace,
                    evaluate || ctx.evaluate_by_default(),
                    &cancel,
                )
                .await;
                Ok(())
            }
            Err(err) => {
                report(&out, &err, show_trace);
                Err(err)
            }
        }
    })
    .await
}
