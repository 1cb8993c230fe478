//! Voice I/O Coordination
//!
//! Speech playback and microphone capture are platform capabilities the
//! core cannot provide itself. They are injected behind small traits, each
//! with a supported/unsupported query, and the [`VoiceCoordinator`]
//! enforces the rules that keep them from fighting:
//!
//! - at most one utterance plays at a time (speaking cancels the previous)
//! - capture and playback are mutually exclusive (capture wins)
//! - starting capture while capturing, and stopping while stopped, are
//!   idempotent no-ops
//! - an unsupported synthesizer silently no-ops; an unsupported recognizer
//!   hides the capture control entirely

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events from an active speech playback
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Audio became audible
    Started,
    /// Audio finished
    Ended,
    /// Playback failed
    Failed(String),
}

/// Events from an active capture session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A completed transcript: finalized segments concatenated in arrival
    /// order, delivered once the session's final result set is available
    Transcript(String),
    /// The capture session ended
    Ended,
    /// Capture failed
    Failed(String),
}

/// Text-to-speech capability
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether synthesis is available on this platform
    fn supported(&self) -> bool;

    /// Start speaking `text`, returning the utterance's event channel.
    ///
    /// Callers cancel any current utterance first; implementations may
    /// assume at most one utterance is live.
    async fn speak(&self, text: &str) -> anyhow::Result<mpsc::Receiver<PlaybackEvent>>;

    /// Cancel the current utterance, if any
    async fn cancel(&self);
}

/// Speech-to-text capability
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether capture is available on this platform
    fn supported(&self) -> bool;

    /// Start a capture session, returning its event channel
    async fn start(&self) -> anyhow::Result<mpsc::Receiver<CaptureEvent>>;

    /// Stop the current capture session, if any
    async fn stop(&self);
}

/// Synthesizer for platforms without text-to-speech.
///
/// Logs once per utterance and does nothing; no audio, no error surfaced.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NullSynthesizer {
    fn supported(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str) -> anyhow::Result<mpsc::Receiver<PlaybackEvent>> {
        anyhow::bail!("speech synthesis not supported")
    }

    async fn cancel(&self) {}
}

/// Recognizer for platforms without speech capture.
///
/// `supported()` is false, which hides the capture control in surfaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecognizer;

#[async_trait]
impl SpeechRecognizer for NullRecognizer {
    fn supported(&self) -> bool {
        false
    }

    async fn start(&self) -> anyhow::Result<mpsc::Receiver<CaptureEvent>> {
        anyhow::bail!("speech capture not supported")
    }

    async fn stop(&self) {}
}

/// Signals the coordinator produces for the orchestrator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceSignal {
    /// Playback became audible
    PlaybackStarted,
    /// Playback finished or was canceled
    PlaybackEnded,
    /// Playback failed
    PlaybackFailed(String),
    /// Capture became active
    CaptureStarted,
    /// Capture ended
    CaptureEnded,
    /// Capture failed
    CaptureFailed(String),
    /// A completed transcript is ready to submit as a user turn
    TranscriptReady(String),
}

/// Coordinates mutually-exclusive playback and capture
pub struct VoiceCoordinator {
    synthesizer: Box<dyn SpeechSynthesizer>,
    recognizer: Box<dyn SpeechRecognizer>,
    playback_rx: Option<mpsc::Receiver<PlaybackEvent>>,
    capture_rx: Option<mpsc::Receiver<CaptureEvent>>,
    listening: bool,
}

impl VoiceCoordinator {
    /// Create a coordinator over the injected capabilities
    pub fn new(
        synthesizer: Box<dyn SpeechSynthesizer>,
        recognizer: Box<dyn SpeechRecognizer>,
    ) -> Self {
        Self {
            synthesizer,
            recognizer,
            playback_rx: None,
            capture_rx: None,
            listening: false,
        }
    }

    /// Whether text-to-speech is available
    #[must_use]
    pub fn synthesis_supported(&self) -> bool {
        self.synthesizer.supported()
    }

    /// Whether microphone capture is available
    #[must_use]
    pub fn capture_supported(&self) -> bool {
        self.recognizer.supported()
    }

    /// Whether a capture session is active
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Speak `text`, canceling any current utterance first.
    pub async fn speak(&mut self, text: &str) -> Vec<VoiceSignal> {
        let mut signals = Vec::new();
        if let Some(signal) = self.cancel_playback().await {
            signals.push(signal);
        }

        if !self.synthesizer.supported() {
            tracing::debug!("speech synthesis unavailable, skipping playback");
            return signals;
        }

        match self.synthesizer.speak(text).await {
            Ok(rx) => self.playback_rx = Some(rx),
            Err(e) => {
                tracing::warn!(error = %e, "failed to start speech playback");
                signals.push(VoiceSignal::PlaybackFailed(e.to_string()));
            }
        }
        signals
    }

    /// Cancel the current utterance, if any
    pub async fn cancel_playback(&mut self) -> Option<VoiceSignal> {
        if self.playback_rx.take().is_some() {
            self.synthesizer.cancel().await;
            Some(VoiceSignal::PlaybackEnded)
        } else {
            None
        }
    }

    /// Start a capture session.
    ///
    /// Cancels in-progress playback first. A no-op while already capturing
    /// or when capture is unsupported.
    pub async fn start_capture(&mut self) -> Vec<VoiceSignal> {
        let mut signals = Vec::new();

        if !self.recognizer.supported() {
            tracing::debug!("speech capture unsupported, ignoring");
            return signals;
        }
        if self.listening {
            return signals;
        }

        if let Some(signal) = self.cancel_playback().await {
            signals.push(signal);
        }

        match self.recognizer.start().await {
            Ok(rx) => {
                self.capture_rx = Some(rx);
                self.listening = true;
                signals.push(VoiceSignal::CaptureStarted);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start speech capture");
                signals.push(VoiceSignal::CaptureFailed(e.to_string()));
            }
        }
        signals
    }

    /// Stop the capture session. Idempotent.
    pub async fn stop_capture(&mut self) -> Option<VoiceSignal> {
        if !self.listening {
            return None;
        }
        self.recognizer.stop().await;
        self.capture_rx = None;
        self.listening = false;
        Some(VoiceSignal::CaptureEnded)
    }

    /// Drain pending playback and capture events. Non-blocking; called
    /// once per frame by the orchestrator.
    pub fn poll(&mut self) -> Vec<VoiceSignal> {
        let mut signals = Vec::new();

        let mut playback_done = false;
        if let Some(rx) = self.playback_rx.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(PlaybackEvent::Started) => signals.push(VoiceSignal::PlaybackStarted),
                    Ok(PlaybackEvent::Ended) => {
                        signals.push(VoiceSignal::PlaybackEnded);
                        playback_done = true;
                        break;
                    }
                    Ok(PlaybackEvent::Failed(e)) => {
                        signals.push(VoiceSignal::PlaybackFailed(e));
                        playback_done = true;
                        break;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        signals.push(VoiceSignal::PlaybackEnded);
                        playback_done = true;
                        break;
                    }
                }
            }
        }
        if playback_done {
            self.playback_rx = None;
        }

        let mut capture_done = false;
        if let Some(rx) = self.capture_rx.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(CaptureEvent::Transcript(text)) => {
                        signals.push(VoiceSignal::TranscriptReady(text));
                    }
                    Ok(CaptureEvent::Ended) => {
                        signals.push(VoiceSignal::CaptureEnded);
                        capture_done = true;
                        break;
                    }
                    Ok(CaptureEvent::Failed(e)) => {
                        signals.push(VoiceSignal::CaptureFailed(e));
                        capture_done = true;
                        break;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        signals.push(VoiceSignal::CaptureEnded);
                        capture_done = true;
                        break;
                    }
                }
            }
        }
        if capture_done {
            self.capture_rx = None;
            self.listening = false;
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Synthesizer that records utterances and keeps the channel open
    /// (the utterance stays "audible" until canceled).
    struct RecordingSynth {
        utterances: Arc<tokio::sync::Mutex<Vec<String>>>,
        cancels: Arc<AtomicUsize>,
        held_tx: Arc<tokio::sync::Mutex<Option<mpsc::Sender<PlaybackEvent>>>>,
    }

    impl RecordingSynth {
        fn new() -> Self {
            Self {
                utterances: Arc::new(tokio::sync::Mutex::new(Vec::new())),
                cancels: Arc::new(AtomicUsize::new(0)),
                held_tx: Arc::new(tokio::sync::Mutex::new(None)),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for RecordingSynth {
        fn supported(&self) -> bool {
            true
        }

        async fn speak(&self, text: &str) -> anyhow::Result<mpsc::Receiver<PlaybackEvent>> {
            self.utterances.lock().await.push(text.to_string());
            let (tx, rx) = mpsc::channel(4);
            tx.send(PlaybackEvent::Started).await.unwrap();
            *self.held_tx.lock().await = Some(tx);
            Ok(rx)
        }

        async fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedRecognizer {
        events: Vec<CaptureEvent>,
    }

    #[async_trait]
    impl SpeechRecognizer for ScriptedRecognizer {
        fn supported(&self) -> bool {
            true
        }

        async fn start(&self) -> anyhow::Result<mpsc::Receiver<CaptureEvent>> {
            let (tx, rx) = mpsc::channel(8);
            for event in &self.events {
                tx.send(event.clone()).await.unwrap();
            }
            Ok(rx)
        }

        async fn stop(&self) {}
    }

    #[tokio::test]
    async fn test_speak_cancels_previous_utterance() {
        let synth = RecordingSynth::new();
        let cancels = synth.cancels.clone();
        let utterances = synth.utterances.clone();
        let mut voice =
            VoiceCoordinator::new(Box::new(synth), Box::new(NullRecognizer));

        assert!(voice.speak("first").await.is_empty());
        let signals = voice.speak("second").await;
        assert_eq!(signals, vec![VoiceSignal::PlaybackEnded]);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert_eq!(*utterances.lock().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_capture_cancels_playback() {
        let synth = RecordingSynth::new();
        let recognizer = ScriptedRecognizer { events: vec![] };
        let mut voice = VoiceCoordinator::new(Box::new(synth), Box::new(recognizer));

        voice.speak("talking").await;
        let signals = voice.start_capture().await;
        // Playback is canceled before capture's first event.
        assert_eq!(
            signals,
            vec![VoiceSignal::PlaybackEnded, VoiceSignal::CaptureStarted]
        );
        assert!(voice.is_listening());
    }

    #[tokio::test]
    async fn test_start_capture_idempotent() {
        let recognizer = ScriptedRecognizer { events: vec![] };
        let mut voice =
            VoiceCoordinator::new(Box::new(NullSynthesizer), Box::new(recognizer));

        assert_eq!(
            voice.start_capture().await,
            vec![VoiceSignal::CaptureStarted]
        );
        assert!(voice.start_capture().await.is_empty());
        assert!(voice.stop_capture().await.is_some());
        assert!(voice.stop_capture().await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_capture_is_hidden_noop() {
        let mut voice =
            VoiceCoordinator::new(Box::new(NullSynthesizer), Box::new(NullRecognizer));
        assert!(!voice.capture_supported());
        assert!(voice.start_capture().await.is_empty());
        assert!(!voice.is_listening());
    }

    #[tokio::test]
    async fn test_unsupported_synthesis_noop() {
        let mut voice =
            VoiceCoordinator::new(Box::new(NullSynthesizer), Box::new(NullRecognizer));
        assert!(!voice.synthesis_supported());
        assert!(voice.speak("hello").await.is_empty());
        assert!(voice.poll().is_empty());
    }

    #[tokio::test]
    async fn test_poll_delivers_transcript_then_end() {
        let recognizer = ScriptedRecognizer {
            events: vec![
                CaptureEvent::Transcript("hello there".to_string()),
                CaptureEvent::Ended,
            ],
        };
        let mut voice =
            VoiceCoordinator::new(Box::new(NullSynthesizer), Box::new(recognizer));

        voice.start_capture().await;
        let signals = voice.poll();
        assert_eq!(
            signals,
            vec![
                VoiceSignal::TranscriptReady("hello there".to_string()),
                VoiceSignal::CaptureEnded,
            ]
        );
        assert!(!voice.is_listening());
    }

    #[tokio::test]
    async fn test_poll_reports_playback_start() {
        let synth = RecordingSynth::new();
        let mut voice =
            VoiceCoordinator::new(Box::new(synth), Box::new(NullRecognizer));

        voice.speak("hi").await;
        assert_eq!(voice.poll(), vec![VoiceSignal::PlaybackStarted]);
        // Channel still open: nothing more until the utterance ends.
        assert!(voice.poll().is_empty());
    }
}
