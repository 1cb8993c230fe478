//! Conversation State Machine
//!
//! Owns the message list and the single in-flight assistant reply. Every
//! mutation of message content goes through this module; the orchestrator
//! and surfaces only observe.
//!
//! # The pending turn
//!
//! The in-flight reply is tracked as an explicit handle, not inferred from
//! the list tail. Its id is generated when the turn begins, *before* the
//! first chunk, so the first chunk can create the message and later chunks
//! can find it - and a turn that completes after zero chunks is
//! distinguishable from one whose reply is simply empty.

use serde::{Deserialize, Serialize};

use crate::emotion::{parse_reply, Emotion};
use crate::messages::{MessageId, MessageRole};

/// The synthetic greeting seeded at startup. Never sent upstream.
pub const WELCOME_TEXT: &str = "Hey there! I'm Cookie. What's on your mind?";

/// Fixed reply shown (and spoken) when a turn's stream fails.
pub const APOLOGY_TEXT: &str =
    "I'm having a little trouble connecting right now, please try again in a moment.";

/// Fixed id of the synthetic welcome message.
const WELCOME_ID: &str = "welcome-message";

/// A message in the conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub text: String,
}

impl ChatMessage {
    /// Create a new message with a fresh id
    pub fn new(role: MessageRole, text: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            text,
        }
    }
}

/// Handle for the turn currently awaiting its reply
#[derive(Clone, Debug)]
struct PendingTurn {
    /// Pre-generated id for the assistant reply
    reply_id: MessageId,
    /// Whether the reply message has been created by a first chunk
    created: bool,
}

/// Result of completing a turn successfully
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// Id of the finalized reply, `None` if zero chunks ever arrived
    pub message_id: Option<MessageId>,
    /// The parsed emotion (idle if absent or unrecognized)
    pub emotion: Emotion,
    /// The reply text with the emotion directive stripped
    pub display_text: String,
}

/// Result of failing a turn
#[derive(Clone, Debug)]
pub struct ErrorOutcome {
    /// Id of the removed partial reply, if one had been created
    pub removed: Option<MessageId>,
    /// The apology message appended in its place
    pub apology: ChatMessage,
}

/// The conversation: an ordered message list plus the pending turn
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending: Option<PendingTurn>,
}

impl Conversation {
    /// Create an empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the synthetic welcome message and return it.
    ///
    /// The welcome is display-only: [`Conversation::history`] excludes it,
    /// so it never reaches the model.
    pub fn seed_welcome(&mut self) -> &ChatMessage {
        self.messages.push(ChatMessage {
            id: MessageId::fixed(WELCOME_ID),
            role: MessageRole::Assistant,
            text: WELCOME_TEXT.to_string(),
        });
        self.messages.last().expect("just pushed")
    }

    /// Whether a turn is currently awaiting its reply
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Begin a new turn: append the user message and open the pending
    /// handle with a pre-generated reply id.
    ///
    /// Returns `None` (a no-op) for empty/whitespace-only text or while a
    /// turn is already in flight.
    pub fn begin_turn(&mut self, text: &str) -> Option<&ChatMessage> {
        if text.trim().is_empty() {
            tracing::debug!("ignoring empty submission");
            return None;
        }
        if self.pending.is_some() {
            tracing::debug!("ignoring submission while a turn is in flight");
            return None;
        }

        self.messages
            .push(ChatMessage::new(MessageRole::User, text.to_string()));
        self.pending = Some(PendingTurn {
            reply_id: MessageId::new(),
            created: false,
        });
        self.messages.last()
    }

    /// Append a stream chunk to the in-flight reply, creating the reply
    /// message on the very first chunk.
    ///
    /// Returns the updated reply, or `None` when no turn is in flight
    /// (a late chunk after completion/error - dropped).
    pub fn apply_chunk(&mut self, text: &str) -> Option<&ChatMessage> {
        let pending = self.pending.as_mut()?;

        if pending.created {
            let reply = self
                .messages
                .iter_mut()
                .find(|m| m.id == pending.reply_id)?;
            reply.text.push_str(text);
        } else {
            pending.created = true;
            self.messages.push(ChatMessage {
                id: pending.reply_id.clone(),
                role: MessageRole::Assistant,
                text: text.to_string(),
            });
        }

        let reply_id = self.pending.as_ref().map(|p| p.reply_id.clone())?;
        self.messages.iter().find(|m| m.id == reply_id)
    }

    /// Complete the in-flight turn: parse the emotion directive out of the
    /// accumulated reply, finalize the reply text, clear the handle.
    ///
    /// With zero chunks the reply was never created: parsing runs on the
    /// empty string and no message is touched.
    pub fn apply_complete(&mut self) -> Option<TurnOutcome> {
        let pending = self.pending.take()?;

        let accumulated = if pending.created {
            self.messages
                .iter()
                .find(|m| m.id == pending.reply_id)
                .map(|m| m.text.clone())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let directive = parse_reply(&accumulated);

        let message_id = if pending.created {
            if let Some(reply) = self
                .messages
                .iter_mut()
                .find(|m| m.id == pending.reply_id)
            {
                reply.text = directive.display_text.clone();
            }
            Some(pending.reply_id)
        } else {
            None
        };

        Some(TurnOutcome {
            message_id,
            emotion: directive.emotion,
            display_text: directive.display_text,
        })
    }

    /// Fail the in-flight turn: remove the partial reply (if any chunks
    /// created it) and append the fixed apology in its place.
    pub fn apply_error(&mut self) -> Option<ErrorOutcome> {
        let pending = self.pending.take()?;

        let removed = if pending.created {
            self.messages.retain(|m| m.id != pending.reply_id);
            Some(pending.reply_id)
        } else {
            None
        };

        let apology = ChatMessage::new(MessageRole::Assistant, APOLOGY_TEXT.to_string());
        self.messages.push(apology.clone());

        Some(ErrorOutcome { removed, apology })
    }

    /// Messages eligible for upstream requests: everything except the
    /// synthetic welcome. The newest user message is still included; the
    /// transport layer peels it off as the current prompt.
    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.id.0 != WELCOME_ID)
    }

    /// All messages, in order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages in the transcript
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
