//! Artifact store.
//!
//! A small key-value store over named `Artifact` slots with write-if-absent
//! semantics. The file-backed store maps each slot to a fixed relative path
//! under a data directory; the memory store backs dry runs and tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::raw_files::{read_optional, write_if_absent, write_private_if_absent};
use super::{Artifact, StorageError};
use crate::config::ArtifactLayout;

/// Persistent slots keyed by `Artifact`.
pub trait ArtifactStore {
    /// Returns the slot content, or `None` if it was never written.
    fn get(&self, artifact: Artifact) -> Result<Option<Vec<u8>>, StorageError>;

    /// Writes the slot unless it already exists.
    ///
    /// # Returns
    /// * `Ok(true)` if this call wrote the slot.
    /// * `Ok(false)` if it already existed (content untouched).
    fn put_if_absent(&self, artifact: Artifact, data: &[u8]) -> Result<bool, StorageError>;

    fn contains(&self, artifact: Artifact) -> Result<bool, StorageError> {
        Ok(self.get(artifact)?.is_some())
    }

    /// Reads the slot as trimmed UTF-8 text.
    fn get_text(&self, artifact: Artifact) -> Result<Option<String>, StorageError> {
        match self.get(artifact)? {
            None => Ok(None),
            Some(raw) => String::from_utf8(raw)
                .map(|s| Some(s.trim().to_string()))
                .map_err(|e| StorageError::Corrupt {
                    artifact,
                    reason: e.to_string(),
                }),
        }
    }

    fn put_text_if_absent(&self, artifact: Artifact, text: &str) -> Result<bool, StorageError> {
        self.put_if_absent(artifact, text.as_bytes())
    }

    /// Ensures the slot holds exactly `data`.
    ///
    /// Writes it if absent; accepts an identical existing value; rejects a
    /// different one with `StorageError::Conflict`.
    fn put_exact(&self, artifact: Artifact, data: &[u8]) -> Result<(), StorageError> {
        if self.put_if_absent(artifact, data)? {
            return Ok(());
        }
        match self.get(artifact)? {
            Some(existing) if existing == data => Ok(()),
            _ => Err(StorageError::Conflict { artifact }),
        }
    }
}

/// File-backed artifact store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
    layout: ArtifactLayout,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>, layout: ArtifactLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Absolute location of a slot.
    pub fn path_of(&self, artifact: Artifact) -> PathBuf {
        self.root.join(self.layout.path(artifact))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn get(&self, artifact: Artifact) -> Result<Option<Vec<u8>>, StorageError> {
        read_optional(self.path_of(artifact))
    }

    fn put_if_absent(&self, artifact: Artifact, data: &[u8]) -> Result<bool, StorageError> {
        let path = self.path_of(artifact);
        let written = if artifact.is_secret() {
            write_private_if_absent(&path, data)?
        } else {
            write_if_absent(&path, data)?
        };
        if written {
            log::info!("Stored {} at {}", artifact, path.display());
        } else {
            log::debug!("{} already present at {}, left untouched", artifact, path.display());
        }
        Ok(written)
    }
}

/// In-memory artifact store.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    slots: RefCell<BTreeMap<Artifact, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a slot, e.g. with artifacts produced by earlier steps.
    pub fn with(self, artifact: Artifact, data: impl Into<Vec<u8>>) -> Self {
        self.slots.borrow_mut().insert(artifact, data.into());
        self
    }

    /// Copy of every slot, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<Artifact, Vec<u8>> {
        self.slots.borrow().clone()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn get(&self, artifact: Artifact) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.slots.borrow().get(&artifact).cloned())
    }

    fn put_if_absent(&self, artifact: Artifact, data: &[u8]) -> Result<bool, StorageError> {
        let mut slots = self.slots.borrow_mut();
        if slots.contains_key(&artifact) {
            return Ok(false);
        }
        slots.insert(artifact, data.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_slots_are_distinct() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path(), ArtifactLayout::default());

        let mut paths: Vec<_> = Artifact::ALL.iter().map(|a| store.path_of(*a)).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), Artifact::ALL.len());
    }

    #[test]
    fn test_file_store_write_once() {
        let dir = TempDir::new().unwrap();
        let store = FileArtifactStore::new(dir.path(), ArtifactLayout::default());

        assert!(!store.contains(Artifact::Expiry).unwrap());
        assert!(store.put_text_if_absent(Artifact::Expiry, "1700000000").unwrap());
        assert!(!store.put_text_if_absent(Artifact::Expiry, "1800000000").unwrap());
        assert_eq!(
            store.get_text(Artifact::Expiry).unwrap().as_deref(),
            Some("1700000000")
        );
    }

    #[test]
    fn test_put_exact_conflict() {
        let store = MemoryArtifactStore::new();
        store.put_exact(Artifact::ValidationId, b"abc").unwrap();
        store.put_exact(Artifact::ValidationId, b"abc").unwrap();
        assert!(matches!(
            store.put_exact(Artifact::ValidationId, b"xyz"),
            Err(StorageError::Conflict { artifact: Artifact::ValidationId })
        ));
    }

    #[test]
    fn test_get_text_rejects_invalid_utf8() {
        let store = MemoryArtifactStore::new().with(Artifact::NodeId, vec![0xFF, 0xFE]);
        assert!(matches!(
            store.get_text(Artifact::NodeId),
            Err(StorageError::Corrupt { artifact: Artifact::NodeId, .. })
        ));
    }
}
