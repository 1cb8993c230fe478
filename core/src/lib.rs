//! Cookie Core - Headless Chat Orchestration for an Emotive Avatar Companion
//!
//! This crate contains everything about Cookie that is not pixels: the
//! conversation state machine, the streaming transport to the model
//! endpoint, the avatar mood state machine, and the voice I/O
//! coordination. It is completely independent of any UI framework and can
//! drive a TUI, a GUI, or run headless for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      UI Surface                         │
//! │            (cookie-tui, or a test harness)              │
//! │                                                         │
//! │              SurfaceEvent (up)                          │
//! │            CompanionMessage (down)                      │
//! └──────────────────────┬──────────────────────────────────┘
//!                        │
//! ┌──────────────────────┼──────────────────────────────────┐
//! │                 COOKIE CORE                             │
//! │  ┌───────────────────┴───────────────────────────────┐  │
//! │  │                 Companion                         │  │
//! │  │  ┌────────────┐ ┌────────┐ ┌───────┐ ┌─────────┐  │  │
//! │  │  │Conversation│ │  Mood  │ │ Voice │ │ Backend │  │  │
//! │  │  │   (turns)  │ │ (FSM)  │ │ (I/O) │ │ (HTTP)  │  │  │
//! │  │  └────────────┘ └────────┘ └───────┘ └─────────┘  │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Companion`]: the orchestration core; one instance per session
//! - [`CompanionMessage`]: messages sent from the core to the UI surface
//! - [`SurfaceEvent`]: events sent from the UI surface to the core
//! - [`Conversation`]: the message list plus the single in-flight reply
//! - [`MoodController`]: the avatar mood state machine
//! - [`VoiceCoordinator`]: mutually-exclusive capture and playback
//! - [`ChatBackend`]: streaming transport trait (see [`HttpBackend`])
//!
//! # Concurrency Model
//!
//! Everything runs on the surface's single async task. Network chunks,
//! playback events, and capture results all arrive over channels that the
//! surface drains by calling [`Companion::poll`] once per frame, so no two
//! components ever race on shared state: ordering is exactly channel
//! arrival order.
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any
//! other UI framework. Speech capture and playback are injected behind
//! small capability traits with supported/unsupported queries, so the
//! whole core is testable without an audio environment.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod companion;
pub mod conversation;
pub mod emotion;
pub mod events;
pub mod messages;
pub mod mood;
pub mod theme;
pub mod voice;

// Re-exports for convenience
pub use backend::{ChatBackend, ChatRequest, HistoryEntry, HttpBackend, StreamEvent, TransportError};
pub use companion::{Companion, CompanionConfig};
pub use conversation::{ChatMessage, Conversation, APOLOGY_TEXT, WELCOME_TEXT};
pub use emotion::{parse_reply, Emotion, EmotionDirective};
pub use events::SurfaceEvent;
pub use messages::{BannerLevel, CompanionMessage, CompanionState, MessageId, MessageRole};
pub use mood::{Mood, MoodController, MoodEvent};
pub use theme::{Theme, ThemeStore};
pub use voice::{
    CaptureEvent, NullRecognizer, NullSynthesizer, PlaybackEvent, SpeechRecognizer,
    SpeechSynthesizer, VoiceCoordinator, VoiceSignal,
};
