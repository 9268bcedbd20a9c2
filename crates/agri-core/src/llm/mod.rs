//! LLM API client and types
//!
//! Streams chat completions from an OpenAI-compatible server (LM Studio by default).

mod client;
mod provider;
mod types;

pub use client::OpenAiClient;
pub use provider::{ChatProvider, TokenStream};
pub use types::*;
