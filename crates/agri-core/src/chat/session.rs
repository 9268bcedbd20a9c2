//! Streaming question/answer exchange over a session's history

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::history::{HistoryStore, DEFAULT_MAX_MESSAGES};
use crate::llm::{ChatMessage, ChatProvider, Role};
use crate::{Error, Result};

use super::prompt::system_prompt;
use super::types::{AgriRequest, ChatEvent, NO_QUESTION};

/// Capacity of the per-exchange event channel
const EVENT_BUFFER: usize = 64;

/// Limits applied to every exchange
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Recent messages included in the prompt
    pub history_window: usize,
    /// Persistence cap applied after each turn
    pub max_messages: usize,
    /// Location used when a request doesn't name one
    pub default_location: String,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            history_window: 10,
            max_messages: DEFAULT_MAX_MESSAGES,
            default_location: "India".to_string(),
        }
    }
}

impl From<&Config> for ChatOptions {
    fn from(config: &Config) -> Self {
        Self {
            history_window: config.history.window,
            max_messages: config.history.max_messages,
            default_location: config.prompt.default_location.clone(),
        }
    }
}

/// Orchestrates one question/answer exchange per call
#[derive(Clone)]
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    store: Arc<HistoryStore>,
    options: ChatOptions,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn ChatProvider>, store: Arc<HistoryStore>, options: ChatOptions) -> Self {
        Self {
            provider,
            store,
            options,
        }
    }

    /// Build the model input: system prompt, recent history window, new question
    pub fn build_messages(&self, history: &[ChatMessage], request: &AgriRequest) -> Vec<ChatMessage> {
        let location = request
            .location
            .as_deref()
            .unwrap_or(&self.options.default_location);
        let window_start = history.len().saturating_sub(self.options.history_window);

        let mut messages = Vec::with_capacity(history.len() - window_start + 2);
        messages.push(ChatMessage::system(system_prompt(location, request.crop.as_deref())));
        messages.extend_from_slice(&history[window_start..]);
        messages.push(ChatMessage::user(request.question.clone()));
        messages
    }

    /// Start an exchange and return the receiving end of its event stream.
    ///
    /// An empty question is rejected with [`Error::InvalidRequest`] before any
    /// history is touched. Otherwise the turn runs on its own task: tokens are
    /// forwarded as they arrive, provider failures become an `Error` event,
    /// and the turn is always persisted before the final `Done`. If the
    /// receiver is dropped the provider is still drained and the turn saved.
    pub fn exchange(&self, session_id: &str, request: AgriRequest) -> Result<mpsc::Receiver<ChatEvent>> {
        if request.question.is_empty() {
            return Err(Error::InvalidRequest(NO_QUESTION.to_string()));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let session = self.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            session.run_turn(&session_id, request, &tx).await;
        });

        Ok(rx)
    }

    async fn run_turn(&self, session_id: &str, request: AgriRequest, tx: &mpsc::Sender<ChatEvent>) {
        // Read once, before this turn's messages are appended
        let history = match self.history(session_id).await {
            Ok(history) => history,
            Err(e) => {
                error!("Failed to load history for session {}: {}", session_id, e);
                Vec::new()
            }
        };
        let messages = self.build_messages(&history, &request);

        info!(
            "Exchange for session {}: {} history messages, {} in prompt",
            session_id,
            history.len(),
            messages.len()
        );

        let reply = self.stream_reply(&messages, tx).await;

        if let Err(e) = self.persist_turn(session_id, &request.question, reply).await {
            error!("Failed to persist turn for session {}: {}", session_id, e);
        }

        if tx.send(ChatEvent::Done).await.is_err() {
            debug!("Client for session {} left before completion", session_id);
        }
    }

    /// Forward provider tokens to `tx`, returning everything received.
    ///
    /// Send failures are ignored so a departed client doesn't cut the turn short.
    async fn stream_reply(&self, messages: &[ChatMessage], tx: &mpsc::Sender<ChatEvent>) -> String {
        let mut reply = String::new();

        let mut tokens = match self.provider.stream_chat(messages).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Provider {} failed to start: {}", self.provider.model(), e);
                let _ = tx.send(ChatEvent::Error(e.to_string())).await;
                return reply;
            }
        };

        while let Some(item) = tokens.next().await {
            match item {
                Ok(token) if token.is_empty() => {}
                Ok(token) => {
                    reply.push_str(&token);
                    let _ = tx.send(ChatEvent::Token(token)).await;
                }
                Err(e) => {
                    warn!("Provider {} failed mid-stream: {}", self.provider.model(), e);
                    let _ = tx.send(ChatEvent::Error(e.to_string())).await;
                    break;
                }
            }
        }

        debug!("Reply complete: {} bytes", reply.len());
        reply
    }

    /// Append the user/assistant pair and re-apply the persistence cap
    async fn persist_turn(&self, session_id: &str, question: &str, reply: String) -> Result<()> {
        let session_id = session_id.to_string();
        let question = question.to_string();
        let max_messages = self.options.max_messages;

        self.with_store(move |store| {
            store.append(&session_id, Role::User, question)?;
            store.append(&session_id, Role::Assistant, reply)?;
            store.trim(&session_id, max_messages)
        })
        .await
    }

    /// Delete a session's history; no-op if it has none
    pub async fn clear_session(&self, session_id: &str) -> Result<()> {
        info!("Clearing session: {}", session_id);
        let session_id = session_id.to_string();
        self.with_store(move |store| store.clear(&session_id)).await
    }

    /// Current stored history of a session
    pub async fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let session_id = session_id.to_string();
        self.with_store(move |store| Ok(store.load(&session_id))).await
    }

    /// Run a history file operation on the blocking thread pool
    async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&HistoryStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}
