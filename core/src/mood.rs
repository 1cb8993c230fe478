//! Avatar Mood State Machine
//!
//! The mood controller drives the avatar's expression from application
//! events. It holds exactly one base mood plus an independent "vocalizing"
//! flag; "speaking" is never a stored mood, it is a mouth overlay the
//! renderer applies while audio is playing.
//!
//! Several event sources (microphone, playback, the reply stream) compete
//! for the avatar, so transitions live in one explicit, priority-ordered
//! function rather than scattered conditionals.

use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;

/// Avatar base moods
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mood {
    /// Default resting state
    #[default]
    Idle,
    /// Waiting on the model, no reply chunk yet
    Thinking,
    /// Microphone capture is active
    Listening,
    /// Sweet, affectionate
    Cute,
    /// Down, apologetic
    Sad,
    /// Very sad (renderer shows tears)
    Sobbing,
    /// Enthusiastic
    Excited,
    /// Annoyed
    Angry,
    /// Something is visibly wrong
    Error,
}

/// Events that can move the mood state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoodEvent {
    /// Microphone capture became active
    CaptureStarted,
    /// Microphone capture became inactive
    CaptureStopped,
    /// A new turn was submitted
    TurnSubmitted,
    /// First chunk of a reply arrived
    ReplyStarted,
    /// Reply completed with a parsed emotion
    ReplyCompleted(Emotion),
    /// Reply errored
    ReplyFailed,
    /// Speech playback became audible
    PlaybackStarted,
    /// Speech playback finished or was canceled
    PlaybackStopped,
    /// Speech playback failed
    PlaybackFailed,
}

/// The mood transition table.
///
/// Rules, in priority order:
/// 1. Capture active forces `Listening` and cancels vocalizing
///    (listening and speaking are mutually exclusive).
/// 2. Capture inactive reverts `Listening` to `Idle`, and only that.
/// 3. A submitted turn means `Thinking`.
/// 4. The first reply chunk reverts `Thinking` to `Idle`.
/// 5. A completed reply takes the parsed emotion's mood.
/// 6. A failed reply means `Sad`.
///
/// Playback events only touch the vocalizing flag, except a playback
/// failure which also resets the mood to `Idle`.
#[must_use]
pub fn transition(mood: Mood, vocalizing: bool, event: MoodEvent) -> (Mood, bool) {
    match event {
        MoodEvent::CaptureStarted => (Mood::Listening, false),
        MoodEvent::CaptureStopped => {
            if mood == Mood::Listening {
                (Mood::Idle, vocalizing)
            } else {
                (mood, vocalizing)
            }
        }
        MoodEvent::TurnSubmitted => (Mood::Thinking, vocalizing),
        MoodEvent::ReplyStarted => {
            if mood == Mood::Thinking {
                (Mood::Idle, vocalizing)
            } else {
                (mood, vocalizing)
            }
        }
        MoodEvent::ReplyCompleted(emotion) => (emotion.into(), vocalizing),
        MoodEvent::ReplyFailed => (Mood::Sad, vocalizing),
        MoodEvent::PlaybackStarted => (mood, true),
        MoodEvent::PlaybackStopped => (mood, false),
        MoodEvent::PlaybackFailed => (Mood::Idle, false),
    }
}

/// State machine wrapper owning the current mood and vocalizing flag
#[derive(Clone, Debug, Default)]
pub struct MoodController {
    mood: Mood,
    vocalizing: bool,
}

impl MoodController {
    /// Create a controller in the idle, silent state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event through the transition table
    pub fn apply(&mut self, event: MoodEvent) {
        let (mood, vocalizing) = transition(self.mood, self.vocalizing, event);
        self.mood = mood;
        self.vocalizing = vocalizing;
    }

    /// Current base mood
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// Whether synthesized speech is currently audible
    #[must_use]
    pub fn is_vocalizing(&self) -> bool {
        self.vocalizing
    }
}
