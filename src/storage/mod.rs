use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;

use crate::notes::Note;

const STORE_TMP_EXTENSION: &str = "json.tmp";

/// Errors from the note store file. `Malformed` is split out from plain IO so
/// the caller can quarantine a damaged file instead of failing startup.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("accessing note store {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("note store {path} contains malformed JSON")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Single-document persistence adapter: the whole note collection lives as
/// one JSON array in one file, read and written synchronously.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted collection. `Ok(None)` means the store has never
    /// been written; malformed contents are reported, not discarded.
    pub fn read_all(&self) -> Result<Option<Vec<Note>>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source: err,
                })
            }
        };
        let notes = serde_json::from_slice(&raw).map_err(|err| StoreError::Malformed {
            path: self.path.clone(),
            source: err,
        })?;
        Ok(Some(notes))
    }

    /// Writes the full collection atomically (tmp file, then rename) so a
    /// crash mid-write never leaves a half-serialized store behind.
    pub fn write_all(&self, notes: &[Note]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(notes).map_err(|err| StoreError::Malformed {
            path: self.path.clone(),
            source: err,
        })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let tmp_path = self.path.with_extension(STORE_TMP_EXTENSION);
        fs::write(&tmp_path, &json).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Moves a damaged store file aside so its bytes survive a reseed.
    /// Returns the quarantine path, or `None` when the file is already gone.
    pub fn quarantine(&self) -> Result<Option<PathBuf>, StoreError> {
        let stamp = OffsetDateTime::now_utc().unix_timestamp();
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "notes.json".to_string());
        let target = self
            .path
            .with_file_name(format!("{file_name}.corrupt-{stamp}"));
        match fs::rename(&self.path, &target) {
            Ok(()) => Ok(Some(target)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io {
                path: self.path.clone(),
                source: err,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::Note;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn sample_note(id: &str, content: &str) -> Note {
        Note {
            id: id.to_string(),
            title: crate::notes::derive_title(content),
            content: content.to_string(),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn read_absent_store_returns_none() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = JsonStore::open(temp.path().join("notes.json"));
        assert!(store.read_all()?.is_none());
        Ok(())
    }

    #[test]
    fn write_then_read_round_trips() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = JsonStore::open(temp.path().join("notes.json"));
        let notes = vec![
            sample_note("a", "Shopping\nmilk and eggs"),
            sample_note("b", "Ideas\n\nbuild a birdhouse"),
        ];
        store.write_all(&notes)?;
        let read_back = store.read_all()?.expect("store present");
        assert_eq!(read_back, notes);
        Ok(())
    }

    #[test]
    fn persisted_layout_uses_camel_case_fields() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("notes.json");
        let store = JsonStore::open(&path);
        store.write_all(&[sample_note("a", "Hello\nworld")])?;
        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.contains("\"createdAt\""));
        assert!(raw.contains("\"updatedAt\""));
        assert!(!raw.contains("created_at"));
        Ok(())
    }

    #[test]
    fn malformed_store_is_reported_not_swallowed() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("notes.json");
        std::fs::write(&path, b"{ not json ]")?;
        let store = JsonStore::open(&path);
        assert_matches!(store.read_all(), Err(StoreError::Malformed { .. }));
        Ok(())
    }

    #[test]
    fn quarantine_preserves_damaged_bytes() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("notes.json");
        std::fs::write(&path, b"garbage")?;
        let store = JsonStore::open(&path);
        let moved = store.quarantine()?.expect("file was present");
        assert!(!path.exists());
        assert_eq!(std::fs::read(&moved)?, b"garbage");
        Ok(())
    }
}
