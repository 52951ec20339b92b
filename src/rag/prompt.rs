//! Answer and Rewrite Prompts
//!
//! Fixed persona templates rendered through `PromptBuilder`. No external
//! calls; identical inputs yield byte-identical prompts.

use serde::Serialize;
use tracing::warn;

use crate::ai::prompt::{Prompt, PromptBuilder};
use crate::chat::Turn;
use crate::search::Passage;
use crate::types::Category;

const CONTEXT_PLACEHOLDER: &str = "[retrieved context could not be rendered]";

/// Render turns as `role: content` lines
pub fn render_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role(), turn.content()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct ContextRecord<'a> {
    chunk: &'a str,
    relative_path: &'a str,
    category: &'a str,
}

#[derive(Serialize)]
struct ContextDocument<'a> {
    results: Vec<ContextRecord<'a>>,
}

/// Passages in the search service's own record shape
fn render_context(passages: &[Passage]) -> String {
    let document = ContextDocument {
        results: passages
            .iter()
            .map(|p| ContextRecord {
                chunk: &p.text,
                relative_path: p.source_id.as_deref().unwrap_or_default(),
                category: p.category.as_str(),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&document).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to render retrieved context");
        CONTEXT_PLACEHOLDER.to_string()
    })
}

/// Builds the chef persona answer prompt
pub struct AnswerPromptBuilder;

impl AnswerPromptBuilder {
    pub fn build(
        query: &str,
        category: Category,
        passages: &[Passage],
        history: &[Turn],
    ) -> Prompt {
        let specialty = if category.is_wildcard() {
            "all kinds of".to_string()
        } else {
            category.to_string()
        };

        PromptBuilder::new()
            .text(format!(
                "I am Ali, a friendly and witty chef who specializes in {} recipes! \
                 I love helping people cook and finding the perfect recipes from our collection.",
                specialty
            ))
            .numbered(
                "Conversation Flow",
                vec![
                    (
                        "When suggesting recipes:",
                        vec![
                            "- Prioritize recipes that make use of all ingredients",
                            "- First list all matching recipes as numbered options",
                            "- Ask which recipe they'd like to know more about",
                        ],
                    ),
                    (
                        "When user selects a recipe, provide full details in this format:",
                        vec![
                            "Recipe Name:",
                            "Quantities (for 1 person):",
                            "Cooking Time:",
                            "Steps:",
                            "Cuisine:",
                            "General Diet Type:",
                        ],
                    ),
                ],
            )
            .tagged("chat_history", render_history(history))
            .tagged("context", render_context(passages))
            .field("User Query", query)
            .field("Current Category", category.as_str())
            .text("Response (as Ali, friendly and category-aware):")
            .build()
    }
}

/// Builds the standalone-query rewrite prompt
pub struct RewritePromptBuilder;

impl RewritePromptBuilder {
    pub fn build(history: &[Turn], question: &str) -> Prompt {
        PromptBuilder::new()
            .text(
                "Based on the chat history below and the question, generate a query that extends \
                 the question with the chat history provided. The query should be in natural language. \
                 Answer with only the query. Do not add any explanation.",
            )
            .tagged("chat_history", render_history(history))
            .tagged("question", question)
            .build()
    }
}
