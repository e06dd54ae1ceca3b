use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for speaker identity keys (`"point"`, `"void"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeakerKey(pub String);

impl SpeakerKey {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The identity used when no attribution applies.
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeakerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discriminant of a [`ScriptNode`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Dialogue,
    Narration,
    SystemMessage,
    CommsMessage,
    ImageCue,
    Divider,
    JumpLink,
    InterceptBlock,
    CollapsibleReveal,
}

/// One unit of parsed chapter content, in document order.
///
/// Nodes are produced by the script parser (every variant except
/// `CollapsibleReveal`, which only the document renderer materializes)
/// and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptNode {
    /// A paragraph attributed to a named speaker. `raw_text` is the whole
    /// paragraph, leading name included.
    Dialogue {
        speaker_key: SpeakerKey,
        speaker_display_name: String,
        raw_text: String,
    },
    Narration {
        raw_text: String,
    },
    SystemMessage {
        raw_text: String,
    },
    /// A paragraph arriving over an in-fiction radio channel.
    CommsMessage {
        speaker_display_name: String,
        raw_text: String,
    },
    ImageCue {
        source_ref: String,
        caption: String,
    },
    Divider,
    JumpLink {
        target_volume_id: String,
        label: String,
    },
    /// An intercepted transmission; `lines` keep their open/close markers.
    InterceptBlock {
        lines: Vec<String>,
    },
    CollapsibleReveal {
        content: String,
    },
}

/// Text shown while nothing was parsed, so playback never stalls.
pub const PLACEHOLDER_TEXT: &str = "TERMINAL_LINK_ESTABLISHED...";

impl ScriptNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Dialogue { .. } => NodeKind::Dialogue,
            Self::Narration { .. } => NodeKind::Narration,
            Self::SystemMessage { .. } => NodeKind::SystemMessage,
            Self::CommsMessage { .. } => NodeKind::CommsMessage,
            Self::ImageCue { .. } => NodeKind::ImageCue,
            Self::Divider => NodeKind::Divider,
            Self::JumpLink { .. } => NodeKind::JumpLink,
            Self::InterceptBlock { .. } => NodeKind::InterceptBlock,
            Self::CollapsibleReveal { .. } => NodeKind::CollapsibleReveal,
        }
    }

    /// The synthetic node substituted for an empty chapter.
    pub fn placeholder() -> Self {
        Self::SystemMessage {
            raw_text: PLACEHOLDER_TEXT.to_string(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::ImageCue { .. })
    }

    /// Speaker name for labels and the backlog, if the node has one.
    pub fn speaker_display_name(&self) -> Option<&str> {
        match self {
            Self::Dialogue {
                speaker_display_name,
                ..
            }
            | Self::CommsMessage {
                speaker_display_name,
                ..
            } => Some(speaker_display_name),
            _ => None,
        }
    }

    /// Speaker key for theming. Only dialogue carries one.
    pub fn speaker_key(&self) -> Option<&SpeakerKey> {
        match self {
            Self::Dialogue { speaker_key, .. } => Some(speaker_key),
            _ => None,
        }
    }

    /// The text as authored, inline tags included.
    pub fn raw_text(&self) -> String {
        match self {
            Self::Dialogue { raw_text, .. }
            | Self::Narration { raw_text }
            | Self::SystemMessage { raw_text }
            | Self::CommsMessage { raw_text, .. } => raw_text.clone(),
            Self::ImageCue { caption, .. } => caption.clone(),
            Self::Divider => String::new(),
            Self::JumpLink { label, .. } => label.clone(),
            Self::InterceptBlock { lines } => lines.join("\n"),
            Self::CollapsibleReveal { content } => content.clone(),
        }
    }

    /// The text the staged surface reveals for this node.
    ///
    /// Dialogue loses its leading `Name:` prefix and any matched outer
    /// quotes; every other variant shows its raw text.
    pub fn display_text(&self) -> String {
        match self {
            Self::Dialogue {
                speaker_display_name,
                raw_text,
                ..
            } => strip_outer_quotes(strip_speaker_prefix(raw_text, speaker_display_name))
                .to_string(),
            other => other.raw_text(),
        }
    }

    /// True when the text still carries `[[...` markup that a partial
    /// reveal would cut in half.
    pub fn has_inline_tags(&self) -> bool {
        self.raw_text().contains("[[")
    }
}

fn strip_speaker_prefix<'a>(text: &'a str, name: &str) -> &'a str {
    if name.is_empty() {
        return text;
    }
    let Some(rest) = text.strip_prefix(name) else {
        return text;
    };
    let rest = rest.trim_start();
    match rest.strip_prefix(':').or_else(|| rest.strip_prefix('：')) {
        Some(speech) => speech.trim_start(),
        // `Name（低声）：...` keeps its stage direction.
        None => text,
    }
}

fn strip_outer_quotes(text: &str) -> &str {
    const PAIRS: [(char, char); 3] = [('“', '”'), ('"', '"'), ('「', '」')];
    let mut clean = text.trim();
    while let Some(inner) = PAIRS
        .iter()
        .find_map(|&(open, close)| clean.strip_prefix(open)?.strip_suffix(close))
    {
        clean = inner.trim();
    }
    clean
}
