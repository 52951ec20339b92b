//! Chat Session
//!
//! Explicit per-session context. Sessions share only the pipeline; each owns
//! its transcript, category selection, and history mode.

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::conversation::{ConversationStore, Turn};
use super::window::HistoryMode;
use crate::rag::{PipelineOutcome, QueryPipeline};
use crate::types::{Category, Result};

/// Assistant notice appended when the category changes
pub fn category_switch_message(category: Category) -> String {
    format!(
        "I see you've switched to {category}! Let me help you find some delicious {category} recipes! 👨‍🍳"
    )
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    store: ConversationStore,
    category: Category,
    history: HistoryMode,
}

impl ChatSession {
    /// New session seeded with the welcome turn
    pub fn new(category: Category, history: HistoryMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: ConversationStore::seeded(),
            category,
            history,
        }
    }

    /// Session with an empty transcript, for one-shot questions
    pub fn blank(category: Category, history: HistoryMode) -> Self {
        Self {
            store: ConversationStore::new(),
            ..Self::new(category, history)
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn history(&self) -> HistoryMode {
        self.history
    }

    /// Select a category. Returns true (and appends a notice) if it changed.
    pub fn select_category(&mut self, category: Category) -> bool {
        if category == self.category {
            return false;
        }

        debug!(session = %self.id, from = %self.category, to = %category, "Category switched");
        self.store
            .append(Turn::assistant(category_switch_message(category)));
        self.category = category;
        true
    }

    pub fn set_history(&mut self, history: HistoryMode) {
        self.history = history;
    }

    /// Clear the transcript back to the welcome turn
    pub fn reset(&mut self) {
        self.store.reset();
    }

    /// Run one turn.
    ///
    /// The question is appended before the pipeline starts and stays on
    /// failure; the answer is appended only on success.
    pub async fn submit(
        &mut self,
        pipeline: &QueryPipeline,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        self.store.append(Turn::user(query));

        let outcome = pipeline
            .run(&self.store, query, self.category, self.history, cancel)
            .await?;

        self.store.append(Turn::assistant(outcome.answer.clone()));
        Ok(outcome)
    }
}
