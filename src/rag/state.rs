//! Pipeline States

use serde::{Deserialize, Serialize};
use std::fmt;

/// Query pipeline state machine.
///
/// `AwaitingQuery → Windowing → (Rewriting) → Retrieving → Building →
/// Completing → Done`, with `Errored` reachable from any non-initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    AwaitingQuery,
    Windowing,
    Rewriting,
    Retrieving,
    Building,
    Completing,
    Done,
    Errored,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingQuery => "awaiting_query",
            Self::Windowing => "windowing",
            Self::Rewriting => "rewriting",
            Self::Retrieving => "retrieving",
            Self::Building => "building",
            Self::Completing => "completing",
            Self::Done => "done",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
