//! Avatar Face Renderer
//!
//! Draws Cookie as a small character-art face. The base mood picks the
//! eyes, mouth, and decoration; while speech audio is playing the mouth
//! is replaced by the speaking variant, whatever the mood - eyes and
//! decoration keep expressing the base mood.

use std::time::Duration;

use cookie_core::Mood;
use rand::Rng;

/// Width of the rendered face in terminal cells
pub const FACE_WIDTH: u16 = 11;
/// Height of the rendered face in terminal cells
pub const FACE_HEIGHT: u16 = 5;

/// How long one animation frame lasts
const FRAME_DURATION: Duration = Duration::from_millis(300);
/// How long a blink keeps the eyes closed
const BLINK_DURATION: Duration = Duration::from_millis(150);

/// Animating face state
pub struct AvatarFace {
    elapsed: Duration,
    until_blink: Duration,
    blink_left: Duration,
}

impl AvatarFace {
    /// Create a face with the blink timer armed
    #[must_use]
    pub fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            until_blink: Duration::from_secs(3),
            blink_left: Duration::ZERO,
        }
    }

    /// Advance animations by `delta`
    pub fn update(&mut self, delta: Duration) {
        self.elapsed += delta;

        if self.blink_left > Duration::ZERO {
            self.blink_left = self.blink_left.saturating_sub(delta);
        } else {
            self.until_blink = self.until_blink.saturating_sub(delta);
            if self.until_blink.is_zero() {
                self.blink_left = BLINK_DURATION;
                let secs = rand::thread_rng().gen_range(2..=5);
                self.until_blink = Duration::from_secs(secs);
            }
        }
    }

    /// Current animation frame index
    fn frame(&self) -> usize {
        (self.elapsed.as_millis() / FRAME_DURATION.as_millis()) as usize
    }

    /// Whether the eyes are currently mid-blink
    fn blinking(&self) -> bool {
        self.blink_left > Duration::ZERO
    }

    /// Render the face for the given mood and vocalizing flag
    #[must_use]
    pub fn lines(&self, mood: Mood, vocalizing: bool) -> Vec<String> {
        face_lines(mood, vocalizing, self.blinking(), self.frame())
    }
}

impl Default for AvatarFace {
    fn default() -> Self {
        Self::new()
    }
}

/// Eyes for a mood. Only the calm moods blink.
fn eyes(mood: Mood, blinking: bool) -> &'static str {
    if blinking && matches!(mood, Mood::Idle | Mood::Cute) {
        return "- -";
    }
    match mood {
        Mood::Idle | Mood::Thinking | Mood::Listening => "o o",
        Mood::Cute => "^ ^",
        Mood::Sad => "; ;",
        Mood::Sobbing => "T T",
        Mood::Excited => "* *",
        Mood::Angry => "> <",
        Mood::Error => "x x",
    }
}

/// Mouth for a mood; the speaking overlay wins while vocalizing.
fn mouth(mood: Mood, vocalizing: bool, frame: usize) -> &'static str {
    if vocalizing {
        return if frame % 2 == 0 { " o " } else { " O " };
    }
    match mood {
        Mood::Idle => " u ",
        Mood::Thinking => " - ",
        Mood::Listening => " . ",
        Mood::Cute => " w ",
        Mood::Sad => " n ",
        Mood::Sobbing => " ~ ",
        Mood::Excited => " D ",
        Mood::Angry => " ^ ",
        Mood::Error => " _ ",
    }
}

/// Decoration line above the face
fn decoration(mood: Mood, frame: usize) -> String {
    match mood {
        Mood::Thinking => {
            let dots = ".".repeat(frame % 3 + 1);
            format!("{dots:^width$}", width = FACE_WIDTH as usize)
        }
        Mood::Listening => format!("{:^width$}", "~))", width = FACE_WIDTH as usize),
        Mood::Cute => format!("{:^width$}", ".~*~.", width = FACE_WIDTH as usize),
        Mood::Excited => format!("{:^width$}", "\\o/", width = FACE_WIDTH as usize),
        Mood::Sobbing => format!("{:^width$}", ", ,", width = FACE_WIDTH as usize),
        _ => " ".repeat(FACE_WIDTH as usize),
    }
}

/// Compose the full face
fn face_lines(mood: Mood, vocalizing: bool, blinking: bool, frame: usize) -> Vec<String> {
    vec![
        decoration(mood, frame),
        " .-------. ".to_string(),
        format!(" | {} | ", center(eyes(mood, blinking), 5)),
        format!(" |  {}  | ", mouth(mood, vocalizing, frame)),
        " '-------' ".to_string(),
    ]
}

fn center(s: &str, width: usize) -> String {
    format!("{s:^width$}")
}
