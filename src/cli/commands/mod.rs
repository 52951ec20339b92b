pub mod ask;
pub mod categories;
pub mod chat;
pub mod config;
