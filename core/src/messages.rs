//! Companion Messages
//!
//! Messages sent from the Companion core to the UI surface. The surface is
//! a pure renderer: it folds these messages into its display state and
//! draws, without any business logic of its own.

use serde::{Deserialize, Serialize};

use crate::mood::Mood;

/// Messages from the Companion to the UI surface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CompanionMessage {
    /// A complete message to display
    Message {
        /// Unique message ID for tracking
        id: MessageId,
        /// Who sent this message
        role: MessageRole,
        /// The message content
        content: String,
    },

    /// A streaming chunk of the in-flight assistant reply
    Token {
        /// Message ID the chunk belongs to
        message_id: MessageId,
        /// The chunk text
        text: String,
    },

    /// The in-flight reply completed
    StreamEnd {
        /// Message ID that completed
        message_id: MessageId,
        /// Final content with the emotion directive stripped
        final_content: String,
    },

    /// Remove a message from the transcript
    ///
    /// Sent when a stream errors after the in-flight reply was created:
    /// the partial reply is removed and replaced, never kept.
    MessageRemoved {
        /// Message ID to remove
        message_id: MessageId,
    },

    /// A banner notification to show above the transcript
    Banner {
        /// Banner severity
        level: BannerLevel,
        /// Banner text
        message: String,
    },

    /// The avatar's base mood changed
    Mood {
        /// The new mood
        mood: Mood,
    },

    /// Speech playback started or stopped
    Vocalizing {
        /// Whether synthesized speech is currently audible
        active: bool,
    },

    /// Companion state change
    State {
        /// The new state
        state: CompanionState,
    },

    /// Request the surface to quit
    Quit,
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }

    /// Create a message ID from a fixed string (for synthetic messages)
    pub fn fixed(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// User input
    User,
    /// The assistant (Cookie)
    Assistant,
}

/// Banner severity levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BannerLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Companion operational states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanionState {
    /// Ready for input
    Ready,
    /// A turn was submitted, no reply chunk yet
    Thinking,
    /// Streaming a reply
    Responding,
}

impl CompanionState {
    /// Human-readable description for status lines
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Thinking => "Thinking...",
            Self::Responding => "Responding...",
        }
    }

    /// Whether a turn is currently in flight
    #[must_use]
    pub fn in_flight(self) -> bool {
        matches!(self, Self::Thinking | Self::Responding)
    }
}
