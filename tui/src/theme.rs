//! Theme and Colors
//!
//! Cookie's palette in light and dark variants. The persisted preference
//! (cookie-core's theme store) picks which palette renders.

use cookie_core::{BannerLevel, Mood, Theme};
use ratatui::style::Color;

/// Resolved colors for one theme
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    /// Default foreground text
    pub text: Color,
    /// User message text
    pub user: Color,
    /// Cookie's message text
    pub assistant: Color,
    /// Dim/system text (status line, separators)
    pub dim: Color,
    /// Avatar face accent
    pub face: Color,
    /// Error banner foreground
    pub banner_error: Color,
    /// Warning banner foreground
    pub banner_warning: Color,
    /// Info banner foreground
    pub banner_info: Color,
}

impl Palette {
    /// Palette for light terminals
    #[must_use]
    pub fn light() -> Self {
        Self {
            text: Color::Black,
            user: Color::Rgb(22, 120, 60),
            assistant: Color::Rgb(170, 40, 120),
            dim: Color::Rgb(120, 120, 120),
            face: Color::Rgb(200, 90, 140),
            banner_error: Color::Rgb(180, 30, 30),
            banner_warning: Color::Rgb(160, 110, 20),
            banner_info: Color::Rgb(40, 90, 170),
        }
    }

    /// Palette for dark terminals
    #[must_use]
    pub fn dark() -> Self {
        Self {
            text: Color::White,
            user: Color::Rgb(130, 220, 130),
            assistant: Color::Rgb(255, 140, 200),
            dim: Color::Rgb(110, 110, 110),
            face: Color::Rgb(255, 170, 200),
            banner_error: Color::Rgb(255, 90, 90),
            banner_warning: Color::Rgb(255, 200, 90),
            banner_info: Color::Rgb(120, 170, 255),
        }
    }

    /// Palette for a stored theme preference
    #[must_use]
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self::light(),
            Theme::Dark => Self::dark(),
        }
    }

    /// Banner foreground for a severity
    #[must_use]
    pub fn banner(&self, level: BannerLevel) -> Color {
        match level {
            BannerLevel::Info => self.banner_info,
            BannerLevel::Warning => self.banner_warning,
            BannerLevel::Error => self.banner_error,
        }
    }

    /// Face tint for a mood
    #[must_use]
    pub fn mood_tint(&self, mood: Mood) -> Color {
        match mood {
            Mood::Sad | Mood::Sobbing => Color::Rgb(110, 150, 210),
            Mood::Angry | Mood::Error => self.banner_error,
            Mood::Excited => Color::Rgb(255, 150, 90),
            Mood::Listening => Color::Rgb(120, 200, 160),
            _ => self.face,
        }
    }
}
