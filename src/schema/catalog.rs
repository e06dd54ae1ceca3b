/// Volume and chapter catalog: the source of chapter text and jump targets.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::node::ScriptNode;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate volume id: {0}")]
    DuplicateVolume(String),
}

/// Whether a chapter can be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChapterStatus {
    #[default]
    Available,
    Locked,
}

/// One chapter of raw script text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: ChapterStatus,
    /// Timeline group, used for spoiler gating.
    #[serde(default)]
    pub group: Option<String>,
}

impl Chapter {
    pub fn is_locked(&self) -> bool {
        self.status == ChapterStatus::Locked
    }
}

/// An ordered collection of chapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// All volumes known to the reader, indexed by volume id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    volumes: Vec<Volume>,
    index: FxHashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate volume ids.
    pub fn new(volumes: Vec<Volume>) -> Result<Self, CatalogError> {
        let mut index = FxHashMap::default();
        for (i, volume) in volumes.iter().enumerate() {
            if index.insert(volume.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateVolume(volume.id.clone()));
            }
        }
        Ok(Self { volumes, index })
    }

    /// Load a catalog from a RON file containing a list of volumes.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load_from_ron(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a catalog from a RON string.
    pub fn parse_ron(input: &str) -> Result<Self, CatalogError> {
        let volumes: Vec<Volume> = ron::from_str(input)?;
        tracing::debug!(volume_count = volumes.len(), "Parsed catalog");
        Self::new(volumes)
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn volume(&self, id: &str) -> Option<&Volume> {
        self.index.get(id).map(|&i| &self.volumes[i])
    }

    /// The chapter at `index` within a volume, if both exist.
    pub fn chapter(&self, volume_id: &str, index: usize) -> Option<&Chapter> {
        self.volume(volume_id)?.chapters.get(index)
    }

    /// Resolve a jump target volume id.
    pub fn resolve_jump(&self, target_volume_id: &str) -> Option<&Volume> {
        self.volume(target_volume_id)
    }

    /// Resolve the target of a `JumpLink` node; other nodes resolve to nothing.
    pub fn resolve_link(&self, node: &ScriptNode) -> Option<&Volume> {
        match node {
            ScriptNode::JumpLink {
                target_volume_id, ..
            } => self.resolve_jump(target_volume_id),
            _ => None,
        }
    }
}
