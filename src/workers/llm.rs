//! LLM Adapter: thin RPC wrapper around the LLM worker.
//!
//! Streaming transport is a text event stream of UTF-8 JSON `data:` lines
//! (SSE-shaped), generalized from the JSON-line parsing idiom in
//! `voice-core::ipc::bridge` (line-buffered stdin reads) to
//! `reqwest::Response::bytes_stream()`.

use std::time::Duration;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::TransportError;
use crate::workers::handler::Intent;

const TIMEOUT: Duration = Duration::from_secs(120);

/// Metrics attached to a `Complete` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetrics {
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub generation_ms: u64,
}

/// A tagged message on the streaming LLM channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenEvent {
    Intent { intent: Intent },
    FirstToken { elapsed_ms: u64 },
    Chunk { text: String },
    Complete { full_text: String, metrics: ResponseMetrics },
    Error { message: String },
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct ChatStreamRequest<'a> {
    prompt: &'a str,
    chunk_threshold: usize,
    sentence_boundary: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    text: String,
    #[serde(default)]
    metrics: ResponseMetrics,
}

pub struct LlmAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl LlmAdapter {
    pub fn new(port: u16) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: format!("http://127.0.0.1:{port}"),
        }
    }

    /// Non-streaming response.
    pub async fn respond(&self, prompt: &str) -> Result<(String, ResponseMetrics), TransportError> {
        let resp = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&ChatRequest { prompt })
            .send()
            .await
            .map_err(|e| TransportError::RpcFailure {
                service: "llm".into(),
                cause: e.to_string(),
            })?;

        let body: ChatResponse = resp.json().await.map_err(|e| TransportError::RpcFailure {
            service: "llm".into(),
            cause: e.to_string(),
        })?;

        Ok((body.text, body.metrics))
    }

    /// Streaming response. Returns a channel-backed stream of `TokenEvent`s
    /// fed by a background reader task, per the abstract `Stream<TokenEvent>`
    /// contract in §9.
    pub async fn respond_stream(
        &self,
        prompt: &str,
        chunk_threshold: usize,
        sentence_boundary: bool,
    ) -> Result<ReceiverStream<TokenEvent>, TransportError> {
        let resp = self
            .client
            .post(format!("{}/chat-stream", self.base_url))
            .json(&ChatStreamRequest {
                prompt,
                chunk_threshold,
                sentence_boundary,
            })
            .send()
            .await
            .map_err(|e| TransportError::RpcFailure {
                service: "llm".into(),
                cause: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(TransportError::RpcFailure {
                service: "llm".into(),
                cause: format!("status {}", resp.status()),
            });
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut byte_stream = resp.bytes_stream();
            let mut carry = String::new();
            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(TokenEvent::Error {
                                message: format!("stream read error: {e}"),
                            })
                            .await;
                        return;
                    }
                };
                carry.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = carry.find('\n') {
                    let line = carry[..pos].to_string();
                    carry.drain(..=pos);
                    let payload = line.strip_prefix("data:").unwrap_or(&line).trim();
                    if payload.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<TokenEvent>(payload) {
                        Ok(event) => {
                            let is_terminal =
                                matches!(event, TokenEvent::Complete { .. } | TokenEvent::Error { .. });
                            if tx.send(event).await.is_err() {
                                return;
                            }
                            if is_terminal {
                                return;
                            }
                        }
                        Err(e) => {
                            debug!("malformed token event line: {e}");
                        }
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_event_round_trips_through_json() {
        let event = TokenEvent::Chunk {
            text: "hello ".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"chunk\""));
        let back: TokenEvent = serde_json::from_str(&json).unwrap();
        match back {
            TokenEvent::Chunk { text } => assert_eq!(text, "hello "),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn complete_and_error_are_recognized_as_terminal() {
        let complete = TokenEvent::Complete {
            full_text: "hi".into(),
            metrics: ResponseMetrics::default(),
        };
        let error = TokenEvent::Error {
            message: "oops".into(),
        };
        assert!(matches!(complete, TokenEvent::Complete { .. }));
        assert!(matches!(error, TokenEvent::Error { .. }));
    }
}
