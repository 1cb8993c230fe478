//! HTTP Backend Implementation
//!
//! Speaks the relay endpoint's protocol: `POST` a JSON body of
//! `{history, message}` to a single path, receive the reply as a raw
//! plain-text stream decoded incrementally as UTF-8.
//!
//! The body is *not* framed: a network chunk can end in the middle of a
//! multi-byte code point, so decoding carries the undecodable suffix over
//! to the next chunk instead of emitting replacement characters.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use super::traits::{ChatBackend, ChatRequest, StreamEvent, TransportError};

/// Default endpoint when `COOKIE_ENDPOINT` is unset
const DEFAULT_ENDPOINT: &str = "http://localhost:8787/api/chat";

/// HTTP chat backend
#[derive(Clone)]
pub struct HttpBackend {
    /// Full endpoint URL
    endpoint: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create a backend from the `COOKIE_ENDPOINT` environment variable
    #[must_use]
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("COOKIE_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint)
    }

    /// The configured endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamEvent>> {
        let (tx, rx) = mpsc::channel(100);

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
                code: status.as_u16(),
                body,
            }
            .into());
        }

        let mut stream = response.bytes_stream();

        // Decode on a spawned task feeding the channel. A dropped receiver
        // aborts the task on the next send.
        tokio::spawn(async move {
            let mut carry: Vec<u8> = Vec::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        carry.extend_from_slice(&bytes);
                        let text = decode_valid_prefix(&mut carry);
                        if !text.is_empty() && tx.send(StreamEvent::Chunk(text)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                        return;
                    }
                }
            }

            // A dangling partial code point at end-of-stream is decoded
            // lossily rather than dropped.
            if !carry.is_empty() {
                let text = String::from_utf8_lossy(&carry).into_owned();
                if tx.send(StreamEvent::Chunk(text)).await.is_err() {
                    return;
                }
            }

            let _ = tx.send(StreamEvent::Complete).await;
        });

        Ok(rx)
    }
}

/// Split the longest valid UTF-8 prefix out of `buffer`, leaving any
/// incomplete trailing code point behind for the next network chunk.
///
/// A byte sequence that is invalid outright (not merely incomplete) is
/// decoded lossily so the stream keeps flowing.
fn decode_valid_prefix(buffer: &mut Vec<u8>) -> String {
    match std::str::from_utf8(buffer) {
        Ok(text) => {
            let text = text.to_string();
            buffer.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            // Incomplete trailing code point: decode up to it, keep the rest.
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&buffer[..valid]).into_owned();
            let tail = buffer.split_off(valid);
            *buffer = tail;
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(buffer).into_owned();
            buffer.clear();
            text
        }
    }
}
