//! Display State
//!
//! The bridge between `CompanionMessage`s and rendering. The TUI is a
//! thin client: it folds messages into this state and draws, nothing
//! more.

use cookie_core::{
    BannerLevel, CompanionMessage, CompanionState, MessageId, MessageRole, Mood,
};

/// A rendered conversation message
#[derive(Clone, Debug)]
pub struct DisplayMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// The message content
    pub content: String,
    /// Whether this message is still being streamed
    pub streaming: bool,
}

impl DisplayMessage {
    /// Create a complete display message
    pub fn new(id: MessageId, role: MessageRole, content: String) -> Self {
        Self {
            id,
            role,
            content,
            streaming: false,
        }
    }

    /// Create a streaming message (content appended by tokens)
    pub fn streaming(id: MessageId) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: String::new(),
            streaming: true,
        }
    }

    /// The transcript prefix for this message's role
    pub fn prefix(&self) -> &'static str {
        match self.role {
            MessageRole::User => "You: ",
            MessageRole::Assistant => "Cookie: ",
        }
    }
}

/// A banner to display above the transcript
#[derive(Clone, Debug)]
pub struct DisplayBanner {
    /// Severity
    pub level: BannerLevel,
    /// Banner text
    pub message: String,
}

/// The full display state for the TUI
#[derive(Debug)]
pub struct DisplayState {
    /// Conversation messages
    pub messages: Vec<DisplayMessage>,
    /// Id of the currently streaming message (if any)
    pub streaming_id: Option<MessageId>,
    /// Avatar base mood
    pub mood: Mood,
    /// Whether speech audio is currently playing
    pub vocalizing: bool,
    /// Companion state
    pub state: CompanionState,
    /// Current banner (if any)
    pub banner: Option<DisplayBanner>,
    /// Whether the companion asked us to quit
    pub quit_requested: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            streaming_id: None,
            mood: Mood::Idle,
            vocalizing: false,
            state: CompanionState::Ready,
            banner: None,
            quit_requested: false,
        }
    }
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a companion message into the display state
    pub fn apply_message(&mut self, msg: CompanionMessage) {
        match msg {
            CompanionMessage::Message { id, role, content } => {
                self.messages.push(DisplayMessage::new(id, role, content));
            }

            CompanionMessage::Token { message_id, text } => {
                if self.streaming_id.as_ref() != Some(&message_id) {
                    self.messages
                        .push(DisplayMessage::streaming(message_id.clone()));
                    self.streaming_id = Some(message_id.clone());
                }
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.content.push_str(&text);
                }
            }

            CompanionMessage::StreamEnd {
                message_id,
                final_content,
            } => {
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    msg.content = final_content;
                    msg.streaming = false;
                }
                self.streaming_id = None;
            }

            CompanionMessage::MessageRemoved { message_id } => {
                self.messages.retain(|m| m.id != message_id);
                if self.streaming_id.as_ref() == Some(&message_id) {
                    self.streaming_id = None;
                }
            }

            CompanionMessage::Banner { level, message } => {
                self.banner = Some(DisplayBanner { level, message });
            }

            CompanionMessage::Mood { mood } => {
                self.mood = mood;
            }

            CompanionMessage::Vocalizing { active } => {
                self.vocalizing = active;
            }

            CompanionMessage::State { state } => {
                self.state = state;
                if state == CompanionState::Thinking {
                    // A fresh turn clears the previous turn's banner.
                    self.banner = None;
                }
            }

            CompanionMessage::Quit => {
                self.quit_requested = true;
            }
        }
    }

    /// Whether a turn is in flight with no reply text yet (renders the
    /// typing indicator)
    pub fn awaiting_first_chunk(&self) -> bool {
        self.state == CompanionState::Thinking
    }
}
