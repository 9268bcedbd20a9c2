//! OpenAI-compatible streaming HTTP client
//!
//! Talks to any `/chat/completions` endpoint that streams Server-Sent Events
//! (LM Studio, Ollama, vLLM, OpenAI itself).

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::provider::{ChatProvider, TokenStream};
use super::types::*;

/// Chat-completion client for OpenAI-compatible servers
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Create a new client from LLM configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let url = self.completions_url();
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: true,
        };

        debug!("Sending streaming request to {} ({} messages)", url, messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            warn!("LLM API error: {} - {}", status, body);
            return Err(Error::Provider(format!("{}: {}", status, body)));
        }

        let (tx, rx) = mpsc::channel(64);
        let body = response.bytes_stream();
        tokio::spawn(async move {
            if let Err(e) = forward_tokens(body, &tx).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Longest partial line held while waiting for its `\n`
const MAX_SSE_LINE_BYTES: usize = 1024 * 1024;

/// Read an SSE body and forward each token to `tx` until `[DONE]` or EOF.
async fn forward_tokens<S>(body: S, tx: &mpsc::Sender<Result<String>>) -> Result<()>
where
    S: Stream<Item = reqwest::Result<Bytes>>,
{
    let mut body = std::pin::pin!(body);
    let mut lines = LineBuffer::default();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(Error::Http)?;
        for line in lines.push(&chunk)? {
            if !forward_line(&line, tx).await? {
                return Ok(());
            }
        }
    }

    // Servers may close without terminating the last line
    if let Some(line) = lines.finish() {
        forward_line(&line, tx).await?;
    }

    Ok(())
}

/// Forward one SSE line; `Ok(false)` once nothing more should be read
async fn forward_line(line: &str, tx: &mpsc::Sender<Result<String>>) -> Result<bool> {
    match parse_sse_line(line)? {
        // A failed send means the receiver was dropped
        SseLine::Token(token) => Ok(tx.send(Ok(token)).await.is_ok()),
        SseLine::Done => Ok(false),
        SseLine::Skip => Ok(true),
    }
}

/// Splits a byte stream into complete `\n`-terminated lines.
///
/// Buffers raw bytes so multi-byte characters split across chunks decode intact.
/// A partial line longer than [`MAX_SSE_LINE_BYTES`] is a provider error.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > MAX_SSE_LINE_BYTES {
            self.pending.clear();
            return Err(Error::Provider(format!(
                "SSE line exceeded {} bytes without a newline",
                MAX_SSE_LINE_BYTES
            )));
        }

        Ok(lines)
    }

    /// Take whatever is left after the body ends
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\r').to_string()
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Token(String),
    Done,
    Skip,
}

/// Interpret one SSE line from a chat-completion stream
fn parse_sse_line(line: &str) -> Result<SseLine> {
    // Ignore empty lines, comments, and event:/id: lines
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            debug!("Skipping unparseable stream chunk: {} ({})", data, e);
            return Ok(SseLine::Skip);
        }
    };

    if let Some(message) = chunk.error_message() {
        return Err(Error::Provider(message));
    }

    Ok(chunk
        .content()
        .map(|token| SseLine::Token(token.to_string()))
        .unwrap_or(SseLine::Skip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = LlmConfig {
            base_url: "http://localhost:1234/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/v1");
        assert_eq!(client.completions_url(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(client.model(), "qwen2.5-7b-instruct");
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"data: {\"a\"").unwrap().is_empty());
        let lines = buffer.push(b":1}\r\n\ndata: [DO").unwrap();
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string(), String::new()]);
        let lines = buffer.push(b"NE]\n").unwrap();
        assert_eq!(lines, vec!["data: [DONE]".to_string()]);
    }

    #[test]
    fn test_line_buffer_keeps_split_utf8_intact() {
        let mut buffer = LineBuffer::default();
        let text = "data: खेत\n".as_bytes();
        let (head, tail) = text.split_at(8);
        assert!(buffer.push(head).unwrap().is_empty());
        assert_eq!(buffer.push(tail).unwrap(), vec!["data: खेत".to_string()]);
    }

    #[test]
    fn test_line_buffer_rejects_unterminated_flood() {
        let mut buffer = LineBuffer::default();
        let half = vec![b'a'; MAX_SSE_LINE_BYTES / 2 + 1];
        assert!(buffer.push(&half).unwrap().is_empty());

        let err = buffer.push(&half).unwrap_err();
        assert!(matches!(err, Error::Provider(ref m) if m.contains("without a newline")));
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_line_buffer_accepts_long_terminated_line() {
        let mut buffer = LineBuffer::default();
        let mut line = vec![b'a'; MAX_SSE_LINE_BYTES + 10];
        line.push(b'\n');
        let lines = buffer.push(&line).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_SSE_LINE_BYTES + 10);
    }

    #[test]
    fn test_line_buffer_finish_returns_tail() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"data: [DONE]\r").unwrap().is_empty());
        assert_eq!(buffer.finish(), Some("data: [DONE]".to_string()));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_parse_token_line() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"neem "}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), SseLine::Token("neem ".to_string()));
    }

    #[test]
    fn test_parse_done_and_skips() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert_eq!(parse_sse_line("").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line("event: message").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line("data: not json").unwrap(), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            SseLine::Skip
        );
    }

    #[test]
    fn test_parse_inline_error() {
        let err = parse_sse_line(r#"data: {"error":{"message":"context length exceeded"}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ref m) if m == "context length exceeded"));
    }

    #[tokio::test]
    async fn test_forward_tokens_until_done() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"Use \"}}]}\n\n",
            )),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"neem \"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"oil.\"}}]}\n\n",
            )),
            Ok(Bytes::from_static(b"data: [DONE]\n\n")),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
            )),
        ];
        let (tx, mut rx) = mpsc::channel(16);

        forward_tokens(futures::stream::iter(chunks), &tx).await.unwrap();
        drop(tx);

        let mut tokens = Vec::new();
        while let Some(item) = rx.recv().await {
            tokens.push(item.unwrap());
        }
        assert_eq!(tokens, vec!["Use ", "neem ", "oil."]);
    }

    #[tokio::test]
    async fn test_forward_tokens_reports_inline_error() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"Use \"}}]}\n\n",
            )),
            Ok(Bytes::from_static(b"data: {\"error\":\"model crashed\"}\n\n")),
        ];
        let (tx, mut rx) = mpsc::channel(16);

        let result = forward_tokens(futures::stream::iter(chunks), &tx).await;
        assert!(matches!(result, Err(Error::Provider(ref m)) if m == "model crashed"));
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().unwrap(), "Use ");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forward_tokens_flushes_unterminated_last_line() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"Use \"}}]}\n\n",
            )),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"neem.\"}}]}",
            )),
        ];
        let (tx, mut rx) = mpsc::channel(16);

        forward_tokens(futures::stream::iter(chunks), &tx).await.unwrap();
        drop(tx);

        let mut tokens = Vec::new();
        while let Some(item) = rx.recv().await {
            tokens.push(item.unwrap());
        }
        assert_eq!(tokens, vec!["Use ", "neem."]);
    }

    #[tokio::test]
    async fn test_forward_tokens_fails_on_oversized_line() {
        let flood = vec![b'x'; MAX_SSE_LINE_BYTES + 1];
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"Use \"}}]}\n\n",
            )),
            Ok(Bytes::from(flood)),
        ];
        let (tx, mut rx) = mpsc::channel(16);

        let result = forward_tokens(futures::stream::iter(chunks), &tx).await;
        assert!(matches!(result, Err(Error::Provider(ref m)) if m.contains("without a newline")));
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().unwrap(), "Use ");
        assert!(rx.recv().await.is_none());
    }
}
