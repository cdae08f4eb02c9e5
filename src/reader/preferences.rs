//! Reader theme and font settings.

use crate::db::StoredPreferences;
use serde::{Deserialize, Serialize};

/// Default font size in pixels.
pub const DEFAULT_FONT_SIZE: u32 = 16;
/// Smallest selectable font size.
pub const MIN_FONT_SIZE: u32 = 12;
/// Largest selectable font size.
pub const MAX_FONT_SIZE: u32 = 24;
/// Default font family.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Color theme.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Black on white.
    #[default]
    Light,
    /// White on near-black.
    Dark,
    /// Black on warm paper.
    Sepia,
}

impl Theme {
    /// Lowercase name, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Sepia => "sepia",
        }
    }

    /// Parse a stored theme name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "sepia" => Some(Theme::Sepia),
            _ => None,
        }
    }
}

/// Settings handed to a reader session when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderPreferences {
    theme: Theme,
    font_size: u32,
    font_family: String,
}

impl Default for ReaderPreferences {
    fn default() -> Self {
        Self::new(Theme::default(), DEFAULT_FONT_SIZE, DEFAULT_FONT_FAMILY)
    }
}

impl ReaderPreferences {
    /// Create preferences; the font size is clamped to the selectable range.
    pub fn new(theme: Theme, font_size: u32, font_family: &str) -> Self {
        let font_family = font_family.trim();
        Self {
            theme,
            font_size: font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
            font_family: if font_family.is_empty() {
                DEFAULT_FONT_FAMILY.to_string()
            } else {
                font_family.to_string()
            },
        }
    }

    /// Theme.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Font size in pixels.
    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    /// Font family.
    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    /// Replace fields that are set, keeping the rest.
    pub fn with_overrides(
        self,
        theme: Option<Theme>,
        font_size: Option<u32>,
        font_family: Option<&str>,
    ) -> Self {
        Self::new(
            theme.unwrap_or(self.theme),
            font_size.unwrap_or(self.font_size),
            font_family.unwrap_or(&self.font_family),
        )
    }

    /// Apply a user's saved preferences. Unknown theme names are ignored.
    pub fn with_stored(self, stored: &StoredPreferences) -> Self {
        let theme = stored.theme.as_deref().and_then(|name| {
            let theme = Theme::parse(name);
            if theme.is_none() {
                tracing::warn!(theme = name, "Ignoring unknown stored theme");
            }
            theme
        });
        let font_size = stored
            .font_size
            .map(|size| size.clamp(0, i64::from(u32::MAX)) as u32);

        self.with_overrides(theme, font_size, stored.font_family.as_deref())
    }

    /// Convert for storage.
    pub fn to_stored(&self) -> StoredPreferences {
        StoredPreferences {
            theme: Some(self.theme.as_str().to_string()),
            font_size: Some(i64::from(self.font_size)),
            font_family: Some(self.font_family.clone()),
        }
    }

    /// Colors and metrics for rendering.
    pub fn style(&self) -> ReaderStyle {
        let background = match self.theme {
            Theme::Light => "#ffffff",
            Theme::Dark => "#1a1a1a",
            Theme::Sepia => "#f5e9d9",
        };
        let foreground = match self.theme {
            Theme::Dark => "#ffffff",
            Theme::Light | Theme::Sepia => "#000000",
        };

        ReaderStyle {
            background,
            foreground,
            font_size_px: self.font_size,
            font_family: self.font_family.clone(),
            line_height: 1.8,
        }
    }
}

/// Resolved rendering style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReaderStyle {
    /// Background color.
    pub background: &'static str,
    /// Text color.
    pub foreground: &'static str,
    /// Font size in pixels.
    pub font_size_px: u32,
    /// Font family.
    pub font_family: String,
    /// Line height multiplier.
    pub line_height: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_is_clamped() {
        assert_eq!(ReaderPreferences::new(Theme::Light, 8, "Arial").font_size(), 12);
        assert_eq!(ReaderPreferences::new(Theme::Light, 40, "Arial").font_size(), 24);
        assert_eq!(ReaderPreferences::new(Theme::Light, 18, "Arial").font_size(), 18);
    }

    #[test]
    fn styles_follow_theme() {
        let dark = ReaderPreferences::new(Theme::Dark, 16, "Georgia").style();
        assert_eq!(dark.background, "#1a1a1a");
        assert_eq!(dark.foreground, "#ffffff");
        assert_eq!(dark.font_family, "Georgia");

        let sepia = ReaderPreferences::new(Theme::Sepia, 16, "").style();
        assert_eq!(sepia.background, "#f5e9d9");
        assert_eq!(sepia.foreground, "#000000");
        assert_eq!(sepia.font_family, DEFAULT_FONT_FAMILY);
    }

    #[test]
    fn stored_preferences_override_defaults() {
        let stored = StoredPreferences {
            theme: Some("Sepia".to_string()),
            font_size: Some(20),
            font_family: None,
        };

        let prefs = ReaderPreferences::default().with_stored(&stored);
        assert_eq!(prefs.theme(), Theme::Sepia);
        assert_eq!(prefs.font_size(), 20);
        assert_eq!(prefs.font_family(), DEFAULT_FONT_FAMILY);

        let bogus = StoredPreferences {
            theme: Some("neon".to_string()),
            ..StoredPreferences::default()
        };
        assert_eq!(ReaderPreferences::default().with_stored(&bogus).theme(), Theme::Light);
    }
}
