//! Integration tests for the full turn lifecycle
//!
//! Drive whole turns through the Companion with scripted backend and
//! voice capabilities: stream events, playback events, and capture
//! results are all pre-filled into their channels, so polling is
//! deterministic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use cookie_core::{
    CaptureEvent, ChatBackend, ChatRequest, Companion, CompanionConfig, CompanionMessage,
    CompanionState, MessageRole, Mood, PlaybackEvent, SpeechRecognizer, SpeechSynthesizer,
    StreamEvent, SurfaceEvent, VoiceCoordinator, APOLOGY_TEXT, WELCOME_TEXT,
};

/// One scripted reply stream
struct Script {
    events: Vec<StreamEvent>,
    /// Keep the channel sender alive so the stream looks still-open
    keep_open: bool,
}

impl Script {
    fn finished(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            keep_open: false,
        }
    }

    fn open(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            keep_open: true,
        }
    }
}

/// Backend that replays scripted streams and records every request
struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    calls: Arc<AtomicUsize>,
    held: Mutex<Vec<mpsc::Sender<StreamEvent>>>,
}

impl ScriptedBackend {
    fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            held: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::finished(vec![StreamEvent::Complete]));

        let (tx, rx) = mpsc::channel(script.events.len().max(1));
        for event in script.events {
            tx.send(event).await.unwrap();
        }
        if script.keep_open {
            self.held.lock().await.push(tx);
        }
        Ok(rx)
    }
}

/// Synthesizer that records utterances; each utterance emits `Started`
/// and then stays audible until canceled.
struct RecordingSynth {
    utterances: Arc<Mutex<Vec<String>>>,
    cancels: Arc<AtomicUsize>,
    held: Arc<Mutex<Vec<mpsc::Sender<PlaybackEvent>>>>,
}

impl RecordingSynth {
    fn new() -> Self {
        Self {
            utterances: Arc::new(Mutex::new(Vec::new())),
            cancels: Arc::new(AtomicUsize::new(0)),
            held: Arc::new(Mutex::new(Vec::new())),
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
        self.held.lock().await.push(tx);
        Ok(rx)
    }

    async fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Recognizer that replays scripted capture events; the channel stays
/// open unless the script ends the session itself.
struct ScriptedRecognizer {
    events: Vec<CaptureEvent>,
    held: Arc<Mutex<Vec<mpsc::Sender<CaptureEvent>>>>,
}

impl ScriptedRecognizer {
    fn new(events: Vec<CaptureEvent>) -> Self {
        Self {
            events,
            held: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn supported(&self) -> bool {
        true
    }

    async fn start(&self) -> anyhow::Result<mpsc::Receiver<CaptureEvent>> {
        let (tx, rx) = mpsc::channel(self.events.len().max(1));
        for event in &self.events {
            tx.send(event.clone()).await.unwrap();
        }
        self.held.lock().await.push(tx);
        Ok(rx)
    }

    async fn stop(&self) {}
}

fn drain(rx: &mut mpsc::Receiver<CompanionMessage>) -> Vec<CompanionMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

fn quiet_config() -> CompanionConfig {
    CompanionConfig {
        greet_on_start: false,
    }
}

#[tokio::test]
async fn welcome_is_seeded_and_spoken_with_cute_mood() {
    let (tx, mut rx) = mpsc::channel(64);
    let synth = RecordingSynth::new();
    let utterances = synth.utterances.clone();
    let voice = VoiceCoordinator::new(
        Box::new(synth),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![]);
    let mut companion = Companion::new(backend, CompanionConfig::default(), voice, tx);

    companion.start().await.unwrap();
    assert_eq!(companion.mood(), Mood::Cute);
    assert_eq!(*utterances.lock().await, vec![WELCOME_TEXT.to_string()]);

    let messages = drain(&mut rx);
    assert!(matches!(
        &messages[0],
        CompanionMessage::Message { content, role: MessageRole::Assistant, .. }
            if content == WELCOME_TEXT
    ));

    // The playback Started event surfaces as vocalizing on the next poll.
    companion.poll().await.unwrap();
    assert!(companion.is_vocalizing());
    assert!(drain(&mut rx)
        .iter()
        .any(|m| matches!(m, CompanionMessage::Vocalizing { active: true })));
}

#[tokio::test]
async fn successful_turn_streams_and_strips_emotion_tag() {
    let (tx, mut rx) = mpsc::channel(64);
    let synth = RecordingSynth::new();
    let utterances = synth.utterances.clone();
    let voice = VoiceCoordinator::new(
        Box::new(synth),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![Script::finished(vec![
        StreamEvent::Chunk("[exc".to_string()),
        StreamEvent::Chunk("ited] Aww".to_string()),
        StreamEvent::Chunk(" congrats!".to_string()),
        StreamEvent::Complete,
    ])]);
    let requests = backend.requests.clone();
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    let len_before = companion.conversation().len();
    drain(&mut rx);

    companion
        .submit("I got a new puppy!".to_string())
        .await
        .unwrap();
    assert_eq!(companion.state(), CompanionState::Thinking);
    assert_eq!(companion.mood(), Mood::Thinking);

    companion.poll().await.unwrap();
    assert_eq!(companion.state(), CompanionState::Ready);
    assert_eq!(companion.mood(), Mood::Excited);

    // Exactly user + assistant were added.
    assert_eq!(companion.conversation().len(), len_before + 2);
    let last = companion.conversation().messages().last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.text, "Aww congrats!");

    // The reply was spoken with the tag stripped.
    assert_eq!(*utterances.lock().await, vec!["Aww congrats!".to_string()]);

    // Tokens all target the pre-generated id; the stream end carries the
    // final display text.
    let messages = drain(&mut rx);
    let token_ids: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            CompanionMessage::Token { message_id, .. } => Some(message_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(token_ids.len(), 3);
    assert!(token_ids.windows(2).all(|w| w[0] == w[1]));
    assert!(messages.iter().any(|m| matches!(
        m,
        CompanionMessage::StreamEnd { final_content, .. } if final_content == "Aww congrats!"
    )));

    // The upstream request excluded the welcome and the newest message.
    let requests = requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].history.is_empty());
    assert_eq!(requests[0].message, "I got a new puppy!");
}

#[tokio::test]
async fn failed_turn_replaces_reply_with_apology() {
    let (tx, mut rx) = mpsc::channel(64);
    let synth = RecordingSynth::new();
    let utterances = synth.utterances.clone();
    let voice = VoiceCoordinator::new(
        Box::new(synth),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![Script::finished(vec![StreamEvent::Error(
        "network down".to_string(),
    )])]);
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    let len_before = companion.conversation().len();
    drain(&mut rx);

    companion.submit("hello?".to_string()).await.unwrap();
    companion.poll().await.unwrap();

    assert_eq!(companion.state(), CompanionState::Ready);
    assert_eq!(companion.mood(), Mood::Sad);

    // User message plus apology; nothing orphaned.
    assert_eq!(companion.conversation().len(), len_before + 2);
    let last = companion.conversation().messages().last().unwrap();
    assert_eq!(last.text, APOLOGY_TEXT);

    let messages = drain(&mut rx);
    // Zero chunks arrived, so there was nothing to remove.
    assert!(!messages
        .iter()
        .any(|m| matches!(m, CompanionMessage::MessageRemoved { .. })));
    assert!(messages.iter().any(|m| matches!(
        m,
        CompanionMessage::Banner { message, .. } if message.contains("network down")
    )));

    assert_eq!(*utterances.lock().await, vec![APOLOGY_TEXT.to_string()]);
}

#[tokio::test]
async fn failed_turn_removes_partial_reply() {
    let (tx, mut rx) = mpsc::channel(64);
    let voice = VoiceCoordinator::new(
        Box::new(RecordingSynth::new()),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![Script::finished(vec![
        StreamEvent::Chunk("Hel".to_string()),
        StreamEvent::Error("boom".to_string()),
    ])]);
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    companion.submit("hi".to_string()).await.unwrap();
    companion.poll().await.unwrap();

    let messages = drain(&mut rx);
    let removed_id = messages
        .iter()
        .find_map(|m| match m {
            CompanionMessage::MessageRemoved { message_id } => Some(message_id.clone()),
            _ => None,
        })
        .expect("partial reply should be removed");

    // The partial text is gone from the transcript; the apology replaced it.
    assert!(companion
        .conversation()
        .messages()
        .iter()
        .all(|m| m.id != removed_id));
    assert_eq!(
        companion.conversation().messages().last().unwrap().text,
        APOLOGY_TEXT
    );
}

#[tokio::test]
async fn submit_while_in_flight_is_noop() {
    let (tx, mut rx) = mpsc::channel(64);
    let voice = VoiceCoordinator::new(
        Box::new(RecordingSynth::new()),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![Script::open(vec![StreamEvent::Chunk(
        "thinking about it".to_string(),
    )])]);
    let calls = backend.calls.clone();
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    companion.submit("first".to_string()).await.unwrap();
    companion.poll().await.unwrap();
    assert_eq!(companion.state(), CompanionState::Responding);

    let len_before = companion.conversation().len();
    drain(&mut rx);

    companion.submit("second".to_string()).await.unwrap();

    // No new message, no second stream.
    assert_eq!(companion.conversation().len(), len_before);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn starting_capture_cancels_playback() {
    let (tx, mut rx) = mpsc::channel(64);
    let synth = RecordingSynth::new();
    let cancels = synth.cancels.clone();
    let voice = VoiceCoordinator::new(
        Box::new(synth),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![]);
    let mut companion = Companion::new(backend, CompanionConfig::default(), voice, tx);

    // The welcome greeting is playing.
    companion.start().await.unwrap();
    companion.poll().await.unwrap();
    assert!(companion.is_vocalizing());
    drain(&mut rx);

    companion
        .handle_event(SurfaceEvent::MicToggled)
        .await
        .unwrap();

    // Playback canceled before capture's first event; mood is listening.
    assert!(!companion.is_vocalizing());
    assert!(companion.is_listening());
    assert_eq!(companion.mood(), Mood::Listening);
    assert!(cancels.load(Ordering::SeqCst) >= 1);

    let messages = drain(&mut rx);
    let vocal_off = messages
        .iter()
        .position(|m| matches!(m, CompanionMessage::Vocalizing { active: false }));
    let listening = messages
        .iter()
        .position(|m| matches!(m, CompanionMessage::Mood { mood: Mood::Listening }));
    assert!(vocal_off.is_some());
    assert!(listening.is_some());
    assert!(vocal_off < listening);
}

#[tokio::test]
async fn finished_transcript_submits_like_typed_input() {
    let (tx, _rx) = mpsc::channel(64);
    let voice = VoiceCoordinator::new(
        Box::new(RecordingSynth::new()),
        Box::new(ScriptedRecognizer::new(vec![
            CaptureEvent::Transcript("what's up".to_string()),
            CaptureEvent::Ended,
        ])),
    );
    let backend = ScriptedBackend::new(vec![Script::finished(vec![
        StreamEvent::Chunk("[idle] not much!".to_string()),
        StreamEvent::Complete,
    ])]);
    let requests = backend.requests.clone();
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    companion
        .handle_event(SurfaceEvent::MicToggled)
        .await
        .unwrap();

    // First poll delivers the transcript and opens the turn; second poll
    // drains the reply stream.
    companion.poll().await.unwrap();
    companion.poll().await.unwrap();

    assert!(companion
        .conversation()
        .messages()
        .iter()
        .any(|m| m.role == MessageRole::User && m.text == "what's up"));
    assert_eq!(
        companion.conversation().messages().last().unwrap().text,
        "not much!"
    );
    assert_eq!(requests.lock().await[0].message, "what's up");
}

#[tokio::test]
async fn unsupported_mic_leaves_text_flow_intact() {
    let (tx, _rx) = mpsc::channel(64);
    let voice = VoiceCoordinator::new(
        Box::new(cookie_core::NullSynthesizer),
        Box::new(cookie_core::NullRecognizer),
    );
    let backend = ScriptedBackend::new(vec![Script::finished(vec![
        StreamEvent::Chunk("[cute] hi!".to_string()),
        StreamEvent::Complete,
    ])]);
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    assert!(!companion.mic_supported());

    // The toggle is hidden, but even a stray event is harmless.
    companion
        .handle_event(SurfaceEvent::MicToggled)
        .await
        .unwrap();
    assert!(!companion.is_listening());

    companion.submit("hello".to_string()).await.unwrap();
    companion.poll().await.unwrap();
    assert_eq!(
        companion.conversation().messages().last().unwrap().text,
        "hi!"
    );
    assert_eq!(companion.mood(), Mood::Cute);
}

#[tokio::test]
async fn zero_chunk_completion_leaves_no_reply() {
    let (tx, mut rx) = mpsc::channel(64);
    let voice = VoiceCoordinator::new(
        Box::new(RecordingSynth::new()),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![Script::finished(vec![StreamEvent::Complete])]);
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    let len_before = companion.conversation().len();
    drain(&mut rx);

    companion.submit("hi".to_string()).await.unwrap();
    companion.poll().await.unwrap();

    // Only the user message was added; emotion parsing ran on "".
    assert_eq!(companion.conversation().len(), len_before + 1);
    assert_eq!(companion.mood(), Mood::Idle);
    assert_eq!(companion.state(), CompanionState::Ready);
    assert!(!drain(&mut rx)
        .iter()
        .any(|m| matches!(m, CompanionMessage::StreamEnd { .. })));
}

#[tokio::test]
async fn empty_submission_is_rejected_silently() {
    let (tx, mut rx) = mpsc::channel(64);
    let voice = VoiceCoordinator::new(
        Box::new(RecordingSynth::new()),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![]);
    let calls = backend.calls.clone();
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    drain(&mut rx);

    companion.submit("   \n ".to_string()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(companion.conversation().len(), 1);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn second_turn_carries_history() {
    let (tx, _rx) = mpsc::channel(128);
    let voice = VoiceCoordinator::new(
        Box::new(RecordingSynth::new()),
        Box::new(ScriptedRecognizer::new(vec![])),
    );
    let backend = ScriptedBackend::new(vec![
        Script::finished(vec![
            StreamEvent::Chunk("[cute] first reply".to_string()),
            StreamEvent::Complete,
        ]),
        Script::finished(vec![
            StreamEvent::Chunk("[idle] second reply".to_string()),
            StreamEvent::Complete,
        ]),
    ]);
    let requests = backend.requests.clone();
    let mut companion = Companion::new(backend, quiet_config(), voice, tx);

    companion.start().await.unwrap();
    companion.submit("one".to_string()).await.unwrap();
    companion.poll().await.unwrap();
    companion.submit("two".to_string()).await.unwrap();
    companion.poll().await.unwrap();

    let requests = requests.lock().await;
    assert_eq!(requests.len(), 2);

    // Second request: prior user turn and its (stripped) reply, oldest
    // first; the welcome never appears.
    let history = &requests[1].history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, "user");
    assert_eq!(history[0].parts[0].text, "one");
    assert_eq!(history[1].role, "model");
    assert_eq!(history[1].parts[0].text, "first reply");
    assert_eq!(requests[1].message, "two");
}
