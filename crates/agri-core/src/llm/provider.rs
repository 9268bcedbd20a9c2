//! Streaming chat provider abstraction

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::Result;

use super::types::ChatMessage;

/// Lazy, finite, non-restartable sequence of reply tokens.
///
/// An `Err` item means the provider failed mid-stream; nothing useful follows it.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat-completion backend that streams its reply token by token.
///
/// Constructed once at startup and handed to the chat session as
/// `Arc<dyn ChatProvider>`; tests substitute a scripted implementation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a streaming completion for `messages`.
    ///
    /// Failing to open the stream is reported through the returned `Result`,
    /// failures after that through the stream items.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TokenStream>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}
