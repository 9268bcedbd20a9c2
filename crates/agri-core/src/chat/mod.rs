//! Agriculture advisor chat
//!
//! Builds a bounded prompt from a session's history, streams the model's
//! reply to the caller and records the turn.

pub mod prompt;
mod session;
mod types;

pub use session::{ChatOptions, ChatSession};
pub use types::{AgriRequest, ChatEvent, NO_QUESTION};
