//! Chat Sessions
//!
//! Per-session transcript, history windowing, and the session context that
//! drives the query pipeline.

mod conversation;
mod session;
mod window;

pub use conversation::{ConversationStore, Role, Turn};
pub use session::{ChatSession, category_switch_message};
pub use window::{HistoryMode, window};
