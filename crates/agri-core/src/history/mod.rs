//! Per-session chat history
//!
//! Stores the ordered message sequence of each session as a flat JSON file.

mod store;

pub use store::{HistoryStore, DEFAULT_MAX_MESSAGES};
