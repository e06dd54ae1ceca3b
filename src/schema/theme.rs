use serde::{Deserialize, Serialize};

use super::node::SpeakerKey;

/// Presentation theme of a chapter, derived from its id alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChapterTheme {
    Variable,
    Rain,
    Daily,
    /// Monochrome "midnight" arc.
    Midnight,
    CollabStar,
    Default,
}

impl ChapterTheme {
    /// Classify a chapter by its id. Earlier rules win.
    pub fn detect(chapter_id: &str) -> Self {
        if chapter_id.starts_with("PB") || chapter_id.contains("PB-") {
            Self::Midnight
        } else if chapter_id.starts_with("story-variable-")
            || chapter_id.contains("byaki")
            || chapter_id.contains("void")
        {
            Self::Variable
        } else if chapter_id.starts_with("story-frag-rain-") {
            Self::Rain
        } else if chapter_id.starts_with("story-coffee")
            || chapter_id.starts_with("story-hotpot")
            || chapter_id.contains("daily")
        {
            Self::Daily
        } else if chapter_id.starts_with("story-collab-star") {
            Self::CollabStar
        } else {
            Self::Default
        }
    }

    /// Returns the theme key string (e.g., "midnight").
    pub fn key(&self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Rain => "rain",
            Self::Daily => "daily",
            Self::Midnight => "midnight",
            Self::CollabStar => "collab-star",
            Self::Default => "default",
        }
    }
}

/// Known character identities and their sprite initials.
const IDENTITIES: &[(&str, &str)] = &[
    ("point", "ZP"),
    ("zeri", "ZL"),
    ("zelo", "ZO"),
    ("void", "VOID"),
    ("dusk", "DR"),
    ("byaki", "BK"),
    ("system", "SYS"),
    ("unknown", "??"),
];

/// The presentation identity a speaker key resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterIdentity {
    /// The key actually used for styling; `unknown` for unrecognised keys.
    pub theme_key: String,
    pub initials: String,
}

impl CharacterIdentity {
    /// Resolve a speaker key under a chapter theme. Never fails: unknown
    /// keys degrade to the `unknown` identity.
    pub fn resolve(key: &SpeakerKey, theme: ChapterTheme) -> Self {
        if theme == ChapterTheme::Midnight {
            // Everyone is rendered alike in the monochrome arc.
            return Self {
                theme_key: key.as_str().to_string(),
                initials: key.as_str().chars().take(2).collect::<String>().to_uppercase(),
            };
        }

        let (theme_key, initials) = IDENTITIES
            .iter()
            .find(|(k, _)| *k == key.as_str())
            .or_else(|| IDENTITIES.iter().find(|(k, _)| *k == SpeakerKey::UNKNOWN))
            .copied()
            .unwrap_or((SpeakerKey::UNKNOWN, "??"));

        Self {
            theme_key: theme_key.to_string(),
            initials: initials.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_themes() {
        assert_eq!(ChapterTheme::detect("PB-03"), ChapterTheme::Midnight);
        assert_eq!(ChapterTheme::detect("side-PB-1"), ChapterTheme::Midnight);
        assert_eq!(ChapterTheme::detect("story-variable-01"), ChapterTheme::Variable);
        assert_eq!(ChapterTheme::detect("story-byaki-diary"), ChapterTheme::Variable);
        assert_eq!(ChapterTheme::detect("story-frag-rain-2"), ChapterTheme::Rain);
        assert_eq!(ChapterTheme::detect("story-hotpot"), ChapterTheme::Daily);
        assert_eq!(ChapterTheme::detect("vol-daily-4"), ChapterTheme::Daily);
        assert_eq!(ChapterTheme::detect("story-collab-star-1"), ChapterTheme::CollabStar);
        assert_eq!(ChapterTheme::detect("ch-01"), ChapterTheme::Default);
    }

    #[test]
    fn midnight_wins_over_variable() {
        assert_eq!(ChapterTheme::detect("PB-void"), ChapterTheme::Midnight);
    }

    #[test]
    fn known_identity() {
        let id = CharacterIdentity::resolve(&SpeakerKey::new("zeri"), ChapterTheme::Default);
        assert_eq!(id.theme_key, "zeri");
        assert_eq!(id.initials, "ZL");
    }

    #[test]
    fn unknown_key_degrades() {
        let id = CharacterIdentity::resolve(&SpeakerKey::new("stranger"), ChapterTheme::Rain);
        assert_eq!(id.theme_key, "unknown");
        assert_eq!(id.initials, "??");
    }

    #[test]
    fn midnight_uses_key_initials() {
        let id = CharacterIdentity::resolve(&SpeakerKey::new("byaki"), ChapterTheme::Midnight);
        assert_eq!(id.initials, "BY");
    }
}
