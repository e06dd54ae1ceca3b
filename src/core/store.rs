/// Flag stores for read status and spoiler acknowledgment.
///
/// The reading session only needs "has this id been recorded" and "record
/// this id"; where the flags live is up to the host.
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// A set of recorded ids.
pub trait KeyValueStore {
    fn has(&self, id: &str) -> bool;

    /// Record `id`. Recording an id twice is not an error.
    fn set(&mut self, id: &str) -> Result<(), StoreError>;
}

/// In-memory store; contents are lost with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ids: FxHashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn has(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn set(&mut self, id: &str) -> Result<(), StoreError> {
        self.ids.insert(id.to_string());
        Ok(())
    }
}

/// Store persisted as a RON list of ids, rewritten on every new id.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    path: PathBuf,
    ids: FxHashSet<String>,
}

impl RonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let ids = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => FxHashSet::default(),
            Ok(contents) => ron::from_str::<Vec<String>>(&contents)?
                .into_iter()
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FxHashSet::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(id_count = ids.len(), "Opened flag store");
        Ok(Self { path, ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Write the current ids plus `extra`; memory is untouched.
    fn save_with(&self, extra: &str) -> Result<(), StoreError> {
        let mut ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        ids.push(extra);
        ids.sort_unstable();
        let contents = ron::ser::to_string_pretty(&ids, ron::ser::PrettyConfig::default())?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for RonFileStore {
    fn has(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn set(&mut self, id: &str) -> Result<(), StoreError> {
        if self.ids.contains(id) {
            return Ok(());
        }
        // Recorded in memory only once it is on disk.
        self.save_with(id)?;
        self.ids.insert(id.to_string());
        tracing::debug!(id, "Recorded flag");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("narrative_script_{}_{name}.ron", std::process::id()))
    }

    #[test]
    fn memory_store_records_ids() {
        let mut store = MemoryStore::new();
        assert!(!store.has("ch-1"));
        store.set("ch-1").unwrap();
        store.set("ch-1").unwrap();
        assert!(store.has("ch-1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_file_opens_empty() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);
        let store = RonFileStore::open(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_persists_across_opens() {
        let path = temp_path("persist");
        let _ = std::fs::remove_file(&path);
        {
            let mut store = RonFileStore::open(&path).unwrap();
            store.set("story-frag-rain-01").unwrap();
            store.set("PB-02").unwrap();
        }
        let reopened = RonFileStore::open(&path).unwrap();
        assert!(reopened.has("PB-02"));
        assert!(reopened.has("story-frag-rain-01"));
        assert_eq!(reopened.len(), 2);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn failed_write_is_not_recorded() {
        let dir = std::env::temp_dir().join(format!("narrative_script_{}_no_such_dir", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("reads.ron");
        let mut store = RonFileStore::open(&path).unwrap();

        assert!(matches!(store.set("ch-1"), Err(StoreError::Io(_))));
        assert!(!store.has("ch-1"));
        assert!(store.set("ch-1").is_err());

        std::fs::create_dir_all(&dir).unwrap();
        store.set("ch-1").unwrap();
        assert!(store.has("ch-1"));
        assert!(RonFileStore::open(&path).unwrap().has("ch-1"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not ron [").unwrap();
        assert!(matches!(RonFileStore::open(&path), Err(StoreError::Ron(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
