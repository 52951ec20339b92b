//! Context Window
//!
//! Bounded slice of prior turns supplied to the rewrite and answer prompts.

use serde::{Deserialize, Serialize};

use super::conversation::{ConversationStore, Turn};

/// Whether prior turns feed the rewrite and answer prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum HistoryMode {
    Enabled { window: usize },
    Disabled,
}

impl HistoryMode {
    pub fn from_flag(enabled: bool, window: usize) -> Self {
        if enabled {
            HistoryMode::Enabled { window }
        } else {
            HistoryMode::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, HistoryMode::Enabled { .. })
    }
}

/// The `max_turns` turns immediately preceding the most recent one.
///
/// The most recent turn is the question in flight and is never included.
/// Returns `min(max_turns, len - 1)` turns, or none when `len <= 1`.
pub fn window(store: &ConversationStore, max_turns: usize) -> &[Turn] {
    let turns = store.all();
    let end = turns.len().saturating_sub(1);
    let start = end.saturating_sub(max_turns);
    &turns[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store_of(n: usize) -> ConversationStore {
        let mut store = ConversationStore::new();
        for i in 0..n {
            if i % 2 == 0 {
                store.append(Turn::user(format!("turn {}", i)));
            } else {
                store.append(Turn::assistant(format!("turn {}", i)));
            }
        }
        store
    }

    #[test]
    fn test_empty_and_single_turn_stores() {
        assert!(window(&store_of(0), 7).is_empty());
        assert!(window(&store_of(1), 7).is_empty());
    }

    #[test]
    fn test_excludes_most_recent_turn() {
        let store = store_of(3);
        let slice = window(&store, 7);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].content(), "turn 0");
        assert_eq!(slice[1].content(), "turn 1");
    }

    #[test]
    fn test_eight_prior_turns_window_seven() {
        // 8 prior turns plus the question in flight
        let store = store_of(9);
        let slice = window(&store, 7);
        assert_eq!(slice.len(), 7);
        assert_eq!(slice, &store.all()[1..8]);
    }

    #[test]
    fn test_zero_window() {
        assert!(window(&store_of(5), 0).is_empty());
    }

    #[test]
    fn test_history_mode_from_flag() {
        assert_eq!(
            HistoryMode::from_flag(true, 7),
            HistoryMode::Enabled { window: 7 }
        );
        assert!(!HistoryMode::from_flag(false, 7).is_enabled());
    }

    proptest! {
        #[test]
        fn prop_window_length(n in 0usize..40, w in 0usize..40) {
            let store = store_of(n);
            let slice = window(&store, w);
            prop_assert_eq!(slice.len(), w.min(n.saturating_sub(1)));
            if let Some(last) = slice.last() {
                // Always ends just before the most recent turn
                prop_assert_eq!(last, &store.all()[n - 2]);
            }
        }
    }
}
