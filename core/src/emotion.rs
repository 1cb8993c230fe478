//! Emotion Tag Parsing
//!
//! The model is prompted to open every reply with a bracketed emotion
//! directive, e.g. `[excited] Aww congrats!`. Once a stream completes, the
//! accumulated text is parsed here: a valid leading tag selects the
//! avatar's mood and is stripped from the display text.
//!
//! An unrecognized tag (or no tag at all) is treated as absent: the mood
//! falls back to idle and the text passes through verbatim. That means a
//! malformed tag stays visible in the transcript and in spoken audio -
//! longstanding behavior, kept as is.

use crate::mood::Mood;

/// Canonical emotions the model may open a reply with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emotion {
    /// Sweet, affectionate
    Cute,
    /// Down, apologetic
    Sad,
    /// Enthusiastic
    Excited,
    /// Neutral
    Idle,
    /// Annoyed
    Angry,
}

impl Emotion {
    /// Parse a tag word, case-insensitively
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "cute" => Some(Self::Cute),
            "sad" => Some(Self::Sad),
            "excited" => Some(Self::Excited),
            "idle" => Some(Self::Idle),
            "angry" => Some(Self::Angry),
            _ => None,
        }
    }

    /// The canonical (lowercase) tag word
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cute => "cute",
            Self::Sad => "sad",
            Self::Excited => "excited",
            Self::Idle => "idle",
            Self::Angry => "angry",
        }
    }
}

impl From<Emotion> for Mood {
    fn from(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Cute => Mood::Cute,
            Emotion::Sad => Mood::Sad,
            Emotion::Excited => Mood::Excited,
            Emotion::Idle => Mood::Idle,
            Emotion::Angry => Mood::Angry,
        }
    }
}

/// A parsed emotion directive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmotionDirective {
    /// The emotion the reply opened with (idle if absent or unrecognized)
    pub emotion: Emotion,
    /// The reply text to display and speak
    pub display_text: String,
}

/// Extract the leading emotion directive from a full reply.
///
/// Recognizes exactly `[word]` at position 0, where `word` is one or more
/// ASCII alphanumerics/underscores, followed by optional whitespace. A
/// valid tag is stripped (with its trailing whitespace); anything else
/// leaves the text untouched and falls back to [`Emotion::Idle`].
///
/// Runs in time proportional to the leading token, not the reply length.
#[must_use]
pub fn parse_reply(text: &str) -> EmotionDirective {
    if let Some(rest) = text.strip_prefix('[') {
        let word_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();
        if word_len > 0 {
            if let Some(after) = rest[word_len..].strip_prefix(']') {
                if let Some(emotion) = Emotion::from_tag(&rest[..word_len]) {
                    return EmotionDirective {
                        emotion,
                        display_text: after.trim_start().to_string(),
                    };
                }
            }
        }
    }

    EmotionDirective {
        emotion: Emotion::Idle,
        display_text: text.to_string(),
    }
}
