/// Reading session: the current position in the catalog, plus the read
/// and spoiler-acknowledgment bookkeeping around opening chapters.
use crate::core::parser::ScriptParser;
use crate::core::playback::{PlaybackConfig, PlaybackState};
use crate::core::speaker::SpeakerTable;
use crate::core::store::{KeyValueStore, StoreError};
use crate::schema::catalog::{Catalog, Chapter, Volume};
use crate::schema::node::ScriptNode;
use crate::schema::theme::ChapterTheme;

/// Groups whose chapters need a spoiler acknowledgment before reading.
pub const DEFAULT_SPOILER_GROUPS: &[&str] = &["phase-2"];

const SPOILER_ACK_PREFIX: &str = "spoiler_ack:";

/// What the reader shows for the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterView {
    Ready {
        chapter_id: String,
        title: String,
        theme: ChapterTheme,
        nodes: Vec<ScriptNode>,
    },
    Locked {
        chapter_id: String,
    },
    NotFound {
        volume_id: String,
        index: usize,
    },
}

impl ChapterView {
    /// The parsed nodes, or nothing when the chapter can't be shown.
    pub fn into_nodes(self) -> Vec<ScriptNode> {
        match self {
            Self::Ready { nodes, .. } => nodes,
            Self::Locked { .. } | Self::NotFound { .. } => Vec::new(),
        }
    }
}

pub struct ReadingSession<'a, R, A> {
    catalog: &'a Catalog,
    speakers: SpeakerTable,
    read_store: R,
    ack_store: A,
    spoiler_groups: Vec<String>,
    volume_id: String,
    index: usize,
}

impl<'a, R: KeyValueStore, A: KeyValueStore> ReadingSession<'a, R, A> {
    pub fn new(
        catalog: &'a Catalog,
        volume_id: impl Into<String>,
        index: usize,
        read_store: R,
        ack_store: A,
    ) -> Self {
        Self {
            catalog,
            speakers: SpeakerTable::default(),
            read_store,
            ack_store,
            spoiler_groups: DEFAULT_SPOILER_GROUPS.iter().map(|g| g.to_string()).collect(),
            volume_id: volume_id.into(),
            index,
        }
    }

    pub fn with_speakers(mut self, speakers: SpeakerTable) -> Self {
        self.speakers = speakers;
        self
    }

    pub fn with_spoiler_groups(mut self, groups: Vec<String>) -> Self {
        self.spoiler_groups = groups;
        self
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn volume(&self) -> Option<&'a Volume> {
        self.catalog.volume(&self.volume_id)
    }

    pub fn current_chapter(&self) -> Option<&'a Chapter> {
        self.catalog.chapter(&self.volume_id, self.index)
    }

    /// Open the current chapter. Parsing runs fresh on every call; a ready
    /// chapter is recorded as read. A failed read-status write is logged and
    /// never keeps the chapter from opening.
    #[tracing::instrument(skip_all, fields(volume = %self.volume_id, index = self.index))]
    pub fn view(&mut self) -> ChapterView {
        let Some(chapter) = self.current_chapter() else {
            tracing::debug!("Chapter not found");
            return ChapterView::NotFound {
                volume_id: self.volume_id.clone(),
                index: self.index,
            };
        };
        if chapter.is_locked() {
            return ChapterView::Locked {
                chapter_id: chapter.id.clone(),
            };
        }

        let nodes = ScriptParser::new(&self.speakers).parse(&chapter.content);
        if let Err(e) = self.read_store.set(&chapter.id) {
            tracing::warn!(chapter = %chapter.id, error = %e, "Failed to record read status");
        }
        tracing::debug!(chapter = %chapter.id, node_count = nodes.len(), "Opened chapter");
        ChapterView::Ready {
            chapter_id: chapter.id.clone(),
            title: chapter.title.clone(),
            theme: ChapterTheme::detect(&chapter.id),
            nodes,
        }
    }

    /// Fresh staged playback for the current chapter.
    pub fn staged_playback(&mut self, config: PlaybackConfig) -> PlaybackState {
        PlaybackState::new(self.view().into_nodes(), config)
    }

    fn chapter_count(&self) -> usize {
        self.volume().map_or(0, |v| v.chapters.len())
    }

    /// Step forward within the volume. Returns false at the last chapter.
    pub fn next_chapter(&mut self) -> bool {
        if self.index + 1 < self.chapter_count() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Step back within the volume. Returns false at the first chapter.
    pub fn prev_chapter(&mut self) -> bool {
        if self.index > 0 && self.index <= self.chapter_count() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a chapter of the current volume. Out-of-range and locked
    /// chapters are refused.
    pub fn select(&mut self, index: usize) -> bool {
        match self.catalog.chapter(&self.volume_id, index) {
            Some(chapter) if !chapter.is_locked() => {
                self.index = index;
                true
            }
            _ => false,
        }
    }

    /// Follow a `JumpLink` to the start of its target volume, if it exists.
    pub fn follow_jump(&mut self, node: &ScriptNode) -> bool {
        match self.catalog.resolve_link(node) {
            Some(volume) => {
                tracing::debug!(volume = %volume.id, "Following jump link");
                self.volume_id = volume.id.clone();
                self.index = 0;
                true
            }
            None => false,
        }
    }

    pub fn is_read(&self, chapter_id: &str) -> bool {
        self.read_store.has(chapter_id)
    }

    /// True when `group` is spoiler-gated and not yet acknowledged.
    pub fn needs_spoiler_ack(&self, group: &str) -> bool {
        self.spoiler_groups.iter().any(|g| g == group) && !self.ack_store.has(&spoiler_ack_key(group))
    }

    pub fn acknowledge_spoiler(&mut self, group: &str) -> Result<(), StoreError> {
        self.ack_store.set(&spoiler_ack_key(group))
    }

    pub fn read_store(&self) -> &R {
        &self.read_store
    }

    pub fn ack_store(&self) -> &A {
        &self.ack_store
    }
}

fn spoiler_ack_key(group: &str) -> String {
    format!("{SPOILER_ACK_PREFIX}{group}")
}
