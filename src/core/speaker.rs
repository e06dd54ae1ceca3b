/// Speaker attribution: maps a paragraph's leading name to a speaker
/// identity through an ordered, data-driven table.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

use crate::schema::node::{ScriptNode, SpeakerKey};

#[derive(Debug, Error)]
pub enum SpeakerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid pattern for speaker '{key}': {source}")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },
}

/// What kind of node an attributed paragraph becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpeakerRole {
    #[default]
    Dialogue,
    System,
}

/// One configured table entry. `pattern` is matched against the start of
/// the joined paragraph; its first capture group, when present, is the
/// display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerEntry {
    pub key: String,
    pub pattern: String,
    #[serde(default)]
    pub role: SpeakerRole,
}

impl SpeakerEntry {
    fn new(key: &str, pattern: &str, role: SpeakerRole) -> Self {
        Self {
            key: key.to_string(),
            pattern: pattern.to_string(),
            role,
        }
    }
}

#[derive(Debug, Clone)]
struct SpeakerRule {
    key: SpeakerKey,
    regex: Regex,
    role: SpeakerRole,
}

/// The outcome of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub key: SpeakerKey,
    pub display_name: String,
    pub role: SpeakerRole,
}

/// Ordered speaker table. The first matching entry wins.
#[derive(Debug, Clone)]
pub struct SpeakerTable {
    rules: Vec<SpeakerRule>,
}

/// The built-in identities, in priority order.
pub fn default_entries() -> Vec<SpeakerEntry> {
    vec![
        SpeakerEntry::new("point", r"^(零点|Point|零點)(?::|：|\(|（)", SpeakerRole::Dialogue),
        SpeakerEntry::new("zeri", r"^(芷漓|Zeri)(?::|：|\(|（)", SpeakerRole::Dialogue),
        SpeakerEntry::new("zelo", r"^(泽洛|Zelo|澤洛)(?::|：|\(|（)", SpeakerRole::Dialogue),
        SpeakerEntry::new("byaki", r"^(白栖|Byaki|白棲)(?::|：|\(|（)", SpeakerRole::Dialogue),
        SpeakerEntry::new("void", r"^(\?\?\?|Void|void)(?::|：|\(|（|>)", SpeakerRole::Dialogue),
        SpeakerEntry::new("system", r"^(SYSTEM|System|系统|系統)(?::|：|\(|（)", SpeakerRole::System),
    ]
}

impl Default for SpeakerTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl SpeakerTable {
    /// The built-in table, compiled once.
    pub fn builtin() -> &'static SpeakerTable {
        static BUILTIN: OnceLock<SpeakerTable> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            Self::from_entries(default_entries()).expect("Invalid built-in speaker regex")
        })
    }

    /// Compile a table from entries, keeping their order.
    pub fn from_entries(entries: Vec<SpeakerEntry>) -> Result<Self, SpeakerError> {
        let mut rules = Vec::with_capacity(entries.len());
        for entry in entries {
            let regex = Regex::new(&entry.pattern).map_err(|source| SpeakerError::Pattern {
                key: entry.key.clone(),
                source,
            })?;
            rules.push(SpeakerRule {
                key: SpeakerKey(entry.key),
                regex,
                role: entry.role,
            });
        }
        Ok(Self { rules })
    }

    /// Load a table from a RON file containing a list of entries.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load_from_ron(path: &Path) -> Result<Self, SpeakerError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a table from a RON string.
    pub fn parse_ron(input: &str) -> Result<Self, SpeakerError> {
        let entries: Vec<SpeakerEntry> = ron::from_str(input)?;
        tracing::debug!(entry_count = entries.len(), "Parsed speaker table");
        Self::from_entries(entries)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Speaker keys in priority order.
    pub fn keys(&self) -> impl Iterator<Item = &SpeakerKey> {
        self.rules.iter().map(|r| &r.key)
    }

    /// Find the first entry whose pattern matches the paragraph start.
    pub fn attribute(&self, paragraph: &str) -> Option<Attribution> {
        self.rules.iter().find_map(|rule| {
            let caps = rule.regex.captures(paragraph)?;
            let name = caps.get(1).or_else(|| caps.get(0))?;
            Some(Attribution {
                key: rule.key.clone(),
                display_name: name.as_str().to_string(),
                role: rule.role,
            })
        })
    }

    /// Build the node for a flushed, non-comms paragraph.
    pub fn classify_paragraph(&self, paragraph: String) -> ScriptNode {
        match self.attribute(&paragraph) {
            Some(Attribution {
                role: SpeakerRole::System,
                ..
            }) => ScriptNode::SystemMessage {
                raw_text: paragraph,
            },
            Some(Attribution {
                key, display_name, ..
            }) => ScriptNode::Dialogue {
                speaker_key: key,
                speaker_display_name: display_name,
                raw_text: paragraph,
            },
            None => ScriptNode::Narration {
                raw_text: paragraph,
            },
        }
    }
}
