//! Chat Backend Traits
//!
//! Trait definitions and wire types for the streaming chat transport.
//! Implementations handle provider-specific details; the core only sees a
//! channel of [`StreamEvent`]s.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::conversation::ChatMessage;
use crate::messages::MessageRole;

/// Events from a streaming reply
///
/// Zero or more `Chunk`s, then exactly one of `Complete` or `Error`.
/// Accumulation of the chunks belongs to the conversation state machine,
/// so the terminal events carry no reply text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incrementally decoded piece of the reply, in arrival order
    Chunk(String),
    /// The stream ended successfully; no further chunks follow
    Complete,
    /// The request failed, the status indicated failure, or the stream
    /// terminated abnormally
    Error(String),
}

/// One entry of upstream conversation history
#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
    /// Wire role: `"user"` or `"model"`
    pub role: &'static str,
    /// Message content parts
    pub parts: Vec<HistoryPart>,
}

/// A single content part of a history entry
#[derive(Clone, Debug, Serialize)]
pub struct HistoryPart {
    /// The text content
    pub text: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            },
            parts: vec![HistoryPart {
                text: msg.text.clone(),
            }],
        }
    }
}

/// A chat turn request
///
/// `history` excludes the synthetic welcome message and the newest user
/// message; the newest message travels separately as `message`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// Prior conversation, oldest first
    pub history: Vec<HistoryEntry>,
    /// The newest user message
    pub message: String,
}

/// Transport failures surfaced as a single stream error
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint answered with a non-success status
    #[error("API error: {status_text} ({code}) - {body}")]
    Status {
        /// Canonical reason phrase of the status
        status_text: String,
        /// Numeric status code
        code: u16,
        /// Response body text, if any
        body: String,
    },
}

/// Streaming chat backend
///
/// Implement this trait to point the core at a different provider.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name, for logs
    fn name(&self) -> &str;

    /// Open a streaming request for one turn.
    ///
    /// Returns a channel receiving the reply as it arrives. The backend
    /// never retries and offers no cancellation: the caller must not start
    /// a new turn while one is in flight.
    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamEvent>>;
}
