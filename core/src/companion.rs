//! Companion - The Orchestration Core
//!
//! The Companion ties the pieces together: it owns the conversation, the
//! mood state machine, the voice coordinator, and the current reply
//! stream. It receives [`SurfaceEvent`]s from the UI surface and answers
//! with [`CompanionMessage`]s over a channel.
//!
//! # Design Philosophy
//!
//! The Companion is UI-agnostic: it neither knows nor cares whether a TUI,
//! a GUI, or a test harness sits on the other end of the channel. All
//! mutation happens on the caller's task - the surface calls
//! [`Companion::poll`] once per frame to drain the reply stream and voice
//! channels, so stream chunks, playback events, and capture results are
//! applied in exactly the order they arrived.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{ChatBackend, ChatRequest, HistoryEntry, StreamEvent};
use crate::conversation::{Conversation, APOLOGY_TEXT, WELCOME_TEXT};
use crate::emotion::Emotion;
use crate::events::SurfaceEvent;
use crate::messages::{BannerLevel, CompanionMessage, CompanionState, MessageRole};
use crate::mood::{Mood, MoodController, MoodEvent};
use crate::voice::{VoiceCoordinator, VoiceSignal};

/// Companion configuration
#[derive(Clone, Debug)]
pub struct CompanionConfig {
    /// Whether to speak the welcome message on startup
    pub greet_on_start: bool,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            greet_on_start: true,
        }
    }
}

impl CompanionConfig {
    /// Create configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            greet_on_start: std::env::var("COOKIE_GREET")
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .unwrap_or(true),
        }
    }
}

/// The Companion - headless orchestration core
pub struct Companion<B: ChatBackend> {
    /// Configuration
    config: CompanionConfig,
    /// Chat backend
    backend: Arc<B>,
    /// The conversation and its in-flight turn
    conversation: Conversation,
    /// Avatar mood state machine
    mood: MoodController,
    /// Playback/capture coordination
    voice: VoiceCoordinator,
    /// Current operational state
    state: CompanionState,
    /// Channel to the UI surface
    tx: mpsc::Sender<CompanionMessage>,
    /// Receiver for the current reply stream
    stream_rx: Option<mpsc::Receiver<StreamEvent>>,
}

impl<B: ChatBackend + 'static> Companion<B> {
    /// Create a new Companion over the given backend and voice capabilities
    pub fn new(
        backend: B,
        config: CompanionConfig,
        voice: VoiceCoordinator,
        tx: mpsc::Sender<CompanionMessage>,
    ) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            conversation: Conversation::new(),
            mood: MoodController::new(),
            voice,
            state: CompanionState::Ready,
            tx,
            stream_rx: None,
        }
    }

    /// Current operational state
    #[must_use]
    pub fn state(&self) -> CompanionState {
        self.state
    }

    /// Current avatar mood
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood.mood()
    }

    /// Whether synthesized speech is currently audible
    #[must_use]
    pub fn is_vocalizing(&self) -> bool {
        self.mood.is_vocalizing()
    }

    /// Whether a capture session is active
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.voice.is_listening()
    }

    /// Whether microphone capture is available (surfaces hide the control
    /// when it is not)
    #[must_use]
    pub fn mic_supported(&self) -> bool {
        self.voice.capture_supported()
    }

    /// The conversation transcript
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Start the Companion: seed the welcome message and greet.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        let welcome = self.conversation.seed_welcome().clone();
        self.send(CompanionMessage::Message {
            id: welcome.id,
            role: welcome.role,
            content: welcome.text,
        })
        .await;
        self.send(CompanionMessage::State { state: self.state })
            .await;

        // The greeting doubles as the avatar's first expression.
        self.apply_mood(MoodEvent::ReplyCompleted(Emotion::Cute)).await;
        if self.config.greet_on_start {
            let signals = self.voice.speak(WELCOME_TEXT).await;
            self.handle_voice_signals(signals).await;
        }
        Ok(())
    }

    /// Handle an event from the UI surface
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        match event {
            SurfaceEvent::UserMessage { content } => self.submit(content).await?,
            SurfaceEvent::MicToggled => self.toggle_capture().await,
            SurfaceEvent::QuitRequested => self.shutdown().await,
        }
        Ok(())
    }

    /// Submit a new user turn.
    ///
    /// A no-op for empty/whitespace-only text and while a turn is already
    /// in flight (the user must wait, then resend).
    pub async fn submit(&mut self, text: String) -> anyhow::Result<()> {
        if text.trim().is_empty() {
            tracing::debug!("ignoring empty submission");
            return Ok(());
        }
        if self.conversation.is_in_flight() {
            tracing::debug!("ignoring submission while a turn is in flight");
            return Ok(());
        }

        // A fresh turn silences everything else first.
        let mut signals = Vec::new();
        if let Some(signal) = self.voice.stop_capture().await {
            signals.push(signal);
        }
        if let Some(signal) = self.voice.cancel_playback().await {
            signals.push(signal);
        }
        self.handle_voice_signals(signals).await;

        let Some(user) = self.conversation.begin_turn(&text).cloned() else {
            return Ok(());
        };
        self.send(CompanionMessage::Message {
            id: user.id,
            role: user.role,
            content: user.text,
        })
        .await;
        self.apply_mood(MoodEvent::TurnSubmitted).await;
        self.set_state(CompanionState::Thinking).await;

        let request = self.build_request(&text);
        match self.backend.send_streaming(&request).await {
            Ok(rx) => self.stream_rx = Some(rx),
            Err(e) => self.fail_turn(&e.to_string()).await,
        }

        Ok(())
    }

    /// Drain pending stream and voice events.
    ///
    /// Call once per frame. Returns true if there was activity.
    pub async fn poll(&mut self) -> anyhow::Result<bool> {
        let mut active = self.poll_stream().await;

        let signals = self.voice.poll();
        if !signals.is_empty() {
            active = true;
        }
        let transcripts = self.collect_voice_signals(signals).await;
        for transcript in transcripts {
            // A finished voice transcript is submitted exactly as typed
            // input would be.
            self.submit(transcript).await?;
        }

        Ok(active)
    }

    /// Drain the current reply stream, applying chunks and the terminal
    /// event in arrival order.
    async fn poll_stream(&mut self) -> bool {
        let events: Vec<StreamEvent> = {
            let Some(rx) = self.stream_rx.as_mut() else {
                return false;
            };

            let mut collected = Vec::new();
            loop {
                match rx.try_recv() {
                    Ok(event) => {
                        let terminal =
                            matches!(event, StreamEvent::Complete | StreamEvent::Error(_));
                        collected.push(event);
                        if terminal {
                            break;
                        }
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        // The adapter vanished without a terminal event.
                        collected.push(StreamEvent::Error(
                            "stream closed unexpectedly".to_string(),
                        ));
                        break;
                    }
                }
            }
            collected
        };

        if events.is_empty() {
            return false;
        }

        for event in events {
            match event {
                StreamEvent::Chunk(text) => {
                    // The first chunk flips thinking back to idle; the
                    // transition table makes later chunks a no-op.
                    self.apply_mood(MoodEvent::ReplyStarted).await;
                    self.set_state(CompanionState::Responding).await;

                    let reply_id = self.conversation.apply_chunk(&text).map(|m| m.id.clone());
                    if let Some(message_id) = reply_id {
                        self.send(CompanionMessage::Token { message_id, text }).await;
                    }
                }

                StreamEvent::Complete => {
                    self.stream_rx = None;
                    let Some(outcome) = self.conversation.apply_complete() else {
                        continue;
                    };
                    if let Some(message_id) = outcome.message_id.clone() {
                        self.send(CompanionMessage::StreamEnd {
                            message_id,
                            final_content: outcome.display_text.clone(),
                        })
                        .await;
                    }
                    self.apply_mood(MoodEvent::ReplyCompleted(outcome.emotion))
                        .await;
                    self.set_state(CompanionState::Ready).await;

                    let signals = self.voice.speak(&outcome.display_text).await;
                    self.handle_voice_signals(signals).await;
                }

                StreamEvent::Error(error) => {
                    self.fail_turn(&error).await;
                }
            }
        }

        true
    }

    /// Fail the in-flight turn: replace the partial reply with the fixed
    /// apology, raise a banner, turn sad, speak the apology.
    async fn fail_turn(&mut self, error: &str) {
        tracing::warn!(error = %error, "turn failed");
        self.stream_rx = None;

        let Some(outcome) = self.conversation.apply_error() else {
            return;
        };
        if let Some(message_id) = outcome.removed {
            self.send(CompanionMessage::MessageRemoved { message_id })
                .await;
        }
        self.send(CompanionMessage::Message {
            id: outcome.apology.id,
            role: MessageRole::Assistant,
            content: outcome.apology.text,
        })
        .await;
        self.send(CompanionMessage::Banner {
            level: BannerLevel::Error,
            message: format!("Oops! I ran into trouble. {error}"),
        })
        .await;
        self.apply_mood(MoodEvent::ReplyFailed).await;
        self.set_state(CompanionState::Ready).await;

        let signals = self.voice.speak(APOLOGY_TEXT).await;
        self.handle_voice_signals(signals).await;
    }

    /// Toggle microphone capture
    async fn toggle_capture(&mut self) {
        let signals = if self.voice.is_listening() {
            self.voice.stop_capture().await.into_iter().collect()
        } else {
            self.voice.start_capture().await
        };
        self.handle_voice_signals(signals).await;
    }

    /// Shut down: silence audio and ask the surface to quit
    async fn shutdown(&mut self) {
        let mut signals = Vec::new();
        if let Some(signal) = self.voice.stop_capture().await {
            signals.push(signal);
        }
        if let Some(signal) = self.voice.cancel_playback().await {
            signals.push(signal);
        }
        self.handle_voice_signals(signals).await;
        self.send(CompanionMessage::Quit).await;
    }

    /// Apply voice signals that cannot carry a transcript
    async fn handle_voice_signals(&mut self, signals: Vec<VoiceSignal>) {
        let transcripts = self.collect_voice_signals(signals).await;
        debug_assert!(transcripts.is_empty(), "transcript outside poll()");
    }

    /// Apply voice signals to the mood machine, collecting any finished
    /// transcripts for submission by the caller
    async fn collect_voice_signals(&mut self, signals: Vec<VoiceSignal>) -> Vec<String> {
        let mut transcripts = Vec::new();
        for signal in signals {
            match signal {
                VoiceSignal::PlaybackStarted => {
                    self.apply_mood(MoodEvent::PlaybackStarted).await;
                }
                VoiceSignal::PlaybackEnded => {
                    self.apply_mood(MoodEvent::PlaybackStopped).await;
                }
                VoiceSignal::PlaybackFailed(e) => {
                    tracing::warn!(error = %e, "speech playback failed");
                    self.apply_mood(MoodEvent::PlaybackFailed).await;
                }
                VoiceSignal::CaptureStarted => {
                    self.apply_mood(MoodEvent::CaptureStarted).await;
                }
                VoiceSignal::CaptureEnded => {
                    self.apply_mood(MoodEvent::CaptureStopped).await;
                }
                VoiceSignal::CaptureFailed(e) => {
                    tracing::warn!(error = %e, "speech capture failed");
                    self.apply_mood(MoodEvent::CaptureStopped).await;
                }
                VoiceSignal::TranscriptReady(text) => transcripts.push(text),
            }
        }
        transcripts
    }

    /// Build the upstream request for the newest user message
    fn build_request(&self, message: &str) -> ChatRequest {
        let mut history: Vec<HistoryEntry> =
            self.conversation.history().map(HistoryEntry::from).collect();
        // The newest user message travels separately as `message`.
        history.pop();
        ChatRequest {
            history,
            message: message.to_string(),
        }
    }

    /// Run an event through the mood machine, reporting changes to the
    /// surface
    async fn apply_mood(&mut self, event: MoodEvent) {
        let mood_before = self.mood.mood();
        let vocalizing_before = self.mood.is_vocalizing();

        self.mood.apply(event);

        if self.mood.mood() != mood_before {
            self.send(CompanionMessage::Mood {
                mood: self.mood.mood(),
            })
            .await;
        }
        if self.mood.is_vocalizing() != vocalizing_before {
            self.send(CompanionMessage::Vocalizing {
                active: self.mood.is_vocalizing(),
            })
            .await;
        }
    }

    /// Set the operational state and notify the surface
    async fn set_state(&mut self, state: CompanionState) {
        if self.state != state {
            self.state = state;
            self.send(CompanionMessage::State { state }).await;
        }
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: CompanionMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("failed to send message to surface: {e}");
        }
    }
}
