//! agri-core: Agri Agent Core Library
//!
//! Streaming chat with an OpenAI-compatible model, per-session history kept
//! as flat JSON files, and configuration loading.

pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;

pub use chat::{AgriRequest, ChatEvent, ChatOptions, ChatSession};
pub use config::{ApiConfig, Config, HistoryConfig, LlmConfig, PromptConfig};
pub use error::{Error, Result};
pub use history::HistoryStore;
pub use llm::{ChatMessage, ChatProvider, OpenAiClient, Role, TokenStream};
