//! Chat message and OpenAI-compatible wire types

use serde::{Deserialize, Serialize};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message in conversation
///
/// Same shape on disk and on the wire: `{"role": "user", "content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub stream: bool,
}

/// One streamed chunk of a chat completion
///
/// ```json
/// {"id":"chatcmpl-...","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}
/// ```
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Some servers report failures inline instead of via status code
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Token text carried by the first choice, if any
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Error message reported inline by the server
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        let message = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        };
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let msg = ChatMessage::user("How do I control aphids on cotton?");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "How do I control aphids on cotton?");
    }

    #[test]
    fn test_role_deserialization() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"assistant","content":"Use neem oil."}"#).unwrap();
        assert_eq!(msg, ChatMessage::assistant("Use neem oil."));

        let bad = serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":"x"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_request_body() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "qwen2.5-7b-instruct",
            messages: &messages,
            temperature: 0.4,
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen2.5-7b-instruct");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_chunk_content() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"Use "},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), Some("Use "));
        assert!(chunk.error_message().is_none());
    }

    #[test]
    fn test_chunk_without_content() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert!(chunk.content().is_none());

        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#)
                .unwrap();
        assert!(chunk.content().is_none());
    }

    #[test]
    fn test_chunk_error_message() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"error":{"message":"model not loaded"}}"#).unwrap();
        assert_eq!(chunk.error_message().as_deref(), Some("model not loaded"));

        let chunk: ChatCompletionChunk = serde_json::from_str(r#"{"error":"overloaded"}"#).unwrap();
        assert_eq!(chunk.error_message().as_deref(), Some("overloaded"));
    }
}
