//! Theme Preference
//!
//! The single persisted preference: a light/dark flag. Read at startup
//! (stored value, then the terminal's background hint, then light) and
//! written on every change. Stored as TOML under the user config
//! directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// UI theme
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background
    #[default]
    Light,
    /// Dark background
    Dark,
}

impl Theme {
    /// The other theme
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Stable name, as stored on disk
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// On-disk representation
#[derive(Serialize, Deserialize)]
struct ThemeFile {
    theme: Theme,
}

/// Loads and saves the theme preference
#[derive(Clone, Debug)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    /// Create a store over an explicit file path
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create a store at the default location under the user config dir
    #[must_use]
    pub fn from_default_location() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cookie")
            .join("theme.toml");
        Self::new(path)
    }

    /// Load the preference: stored value, then the terminal background
    /// hint, then light.
    #[must_use]
    pub fn load(&self) -> Theme {
        let hint = std::env::var("COLORFGBG")
            .ok()
            .and_then(|v| hint_from_colorfgbg(&v));
        self.load_with_hint(hint)
    }

    /// Load with an explicit OS hint (testable without the environment)
    #[must_use]
    pub fn load_with_hint(&self, os_hint: Option<Theme>) -> Theme {
        if let Ok(raw) = std::fs::read_to_string(&self.path) {
            match toml::from_str::<ThemeFile>(&raw) {
                Ok(file) => return file.theme,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable theme file");
                }
            }
        }
        os_hint.unwrap_or(Theme::Light)
    }

    /// Persist the preference. Failures are logged, never surfaced.
    pub fn save(&self, theme: Theme) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(error = %e, "could not create config directory");
                return;
            }
        }
        let contents = toml::to_string(&ThemeFile { theme }).expect("theme serializes");
        if let Err(e) = std::fs::write(&self.path, contents) {
            tracing::warn!(error = %e, "could not save theme preference");
        }
    }
}

/// Interpret the `COLORFGBG` terminal convention (`"<fg>;<bg>"`).
///
/// Background colors 0-6 and 8 are the dark half of the classic palette.
#[must_use]
pub fn hint_from_colorfgbg(value: &str) -> Option<Theme> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    if bg <= 6 || bg == 8 {
        Some(Theme::Dark)
    } else {
        Some(Theme::Light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::new(dir.path().join("theme.toml"));

        store.save(Theme::Dark);
        // A stored value wins over any hint.
        assert_eq!(store.load_with_hint(Some(Theme::Light)), Theme::Dark);

        store.save(Theme::Light);
        assert_eq!(store.load_with_hint(Some(Theme::Dark)), Theme::Light);
    }

    #[test]
    fn test_missing_file_falls_back_to_hint_then_light() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::new(dir.path().join("theme.toml"));

        assert_eq!(store.load_with_hint(Some(Theme::Dark)), Theme::Dark);
        assert_eq!(store.load_with_hint(None), Theme::Light);
    }

    #[test]
    fn test_garbled_file_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.toml");
        std::fs::write(&path, "not = 'a theme'").unwrap();
        let store = ThemeStore::new(path);

        assert_eq!(store.load_with_hint(None), Theme::Light);
    }

    #[test]
    fn test_colorfgbg_hints() {
        assert_eq!(hint_from_colorfgbg("15;0"), Some(Theme::Dark));
        assert_eq!(hint_from_colorfgbg("0;15"), Some(Theme::Light));
        assert_eq!(hint_from_colorfgbg("0;default;7"), Some(Theme::Light));
        assert_eq!(hint_from_colorfgbg("default;default"), None);
        assert_eq!(hint_from_colorfgbg(""), None);
    }
}
