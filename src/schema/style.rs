use serde::{Deserialize, Serialize};

/// The closed set of inline emphasis styles an author can apply with
/// `[[TAG::content]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleVariant {
    /// `MASK`: redacted text, revealed on interaction.
    Masked,
    /// `GREEN`
    Emphasis,
    /// `GLITCH_GREEN`
    GlitchEmphasis,
    /// `VOID`
    VoidEmphasis,
    /// `DANGER`
    Danger,
    /// `BLUE`
    Info,
    /// `WHITE`
    Highlight,
    /// `VOID_VISION`: a collapsible spoiler card.
    SpoilerCard,
}

impl StyleVariant {
    pub const ALL: [StyleVariant; 8] = [
        Self::Masked,
        Self::Emphasis,
        Self::GlitchEmphasis,
        Self::VoidEmphasis,
        Self::Danger,
        Self::Info,
        Self::Highlight,
        Self::SpoilerCard,
    ];

    /// The markup tag name, e.g. `"DANGER"`.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Self::Masked => "MASK",
            Self::Emphasis => "GREEN",
            Self::GlitchEmphasis => "GLITCH_GREEN",
            Self::VoidEmphasis => "VOID",
            Self::Danger => "DANGER",
            Self::Info => "BLUE",
            Self::Highlight => "WHITE",
            Self::SpoilerCard => "VOID_VISION",
        }
    }

    /// Resolve a markup tag name. Names are case-sensitive and the set is
    /// never extended at runtime.
    pub fn from_tag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.tag_name() == name)
    }

    /// Whether the renderer lifts this run out into its own block.
    pub fn is_block_level(&self) -> bool {
        matches!(self, Self::SpoilerCard)
    }
}

/// How a run of text is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunKind {
    Plain,
    Bold,
    Styled(StyleVariant),
}

/// One contiguous run of formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledRun {
    pub kind: RunKind,
    pub text: String,
}

impl StyledRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Plain,
            text: text.into(),
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Bold,
            text: text.into(),
        }
    }

    pub fn styled(variant: StyleVariant, text: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Styled(variant),
            text: text.into(),
        }
    }

    pub fn variant(&self) -> Option<StyleVariant> {
        match self.kind {
            RunKind::Styled(v) => Some(v),
            _ => None,
        }
    }
}
