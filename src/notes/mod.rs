use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::{JsonStore, StoreError};

pub const UNTITLED_TITLE: &str = "Untitled Note";

const WELCOME_CONTENT: &str = "Welcome to Padnote\n\nStart typing to create your first note. \
Your notes are saved automatically to disk.";

/// A single note. The title is never free-standing state: it is always the
/// trimmed first line of the content, falling back to [`UNTITLED_TITLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    fn fresh(content: &str, now: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: derive_title(content),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Trimmed first line of the content, or the untitled fallback when that
/// line is empty or whitespace. Shared by the store and the title editor so
/// the two can never diverge.
pub fn derive_title(content: &str) -> String {
    let first = content.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        UNTITLED_TITLE.to_string()
    } else {
        first.to_string()
    }
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Ordered note collection plus the current selection, persisted in full
/// after every mutation. Owned by the application and injected into the view
/// layer and editor controller; nothing else holds note state.
#[derive(Debug)]
pub struct NotesStore {
    notes: Vec<Note>,
    current: Option<String>,
    persist: JsonStore,
}

impl NotesStore {
    /// Loads the persisted collection. An absent store is seeded with a
    /// welcome note; a corrupt store is quarantined and then reseeded so the
    /// damaged bytes stay recoverable on disk.
    pub fn load(persist: JsonStore) -> Result<Self> {
        let notes = match persist.read_all() {
            Ok(Some(notes)) => notes,
            Ok(None) => {
                tracing::info!(path = %persist.path().display(), "seeding first-run welcome note");
                let seeded = vec![Note::fresh(WELCOME_CONTENT, now_millis())];
                persist
                    .write_all(&seeded)
                    .context("persisting welcome note")?;
                seeded
            }
            Err(StoreError::Malformed { .. }) => {
                let moved = persist.quarantine().context("quarantining corrupt store")?;
                tracing::warn!(
                    quarantined = ?moved.as_deref().map(|p| p.display().to_string()),
                    "note store was corrupt; starting over with a welcome note"
                );
                let seeded = vec![Note::fresh(WELCOME_CONTENT, now_millis())];
                persist
                    .write_all(&seeded)
                    .context("persisting welcome note after quarantine")?;
                seeded
            }
            Err(err) => return Err(err).context("reading note store"),
        };
        let current = notes.first().map(|note| note.id.clone());
        Ok(Self {
            notes,
            current,
            persist,
        })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&Note> {
        let id = self.current.as_deref()?;
        self.notes.iter().find(|note| note.id == id)
    }

    /// Makes an existing note current. Unknown ids leave the selection
    /// untouched and report `false`.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.current = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Creates an empty untitled note, prepends it, persists, and makes it
    /// the current selection.
    pub fn create(&mut self) -> Result<Note> {
        let note = Note::fresh("", now_millis());
        self.notes.insert(0, note.clone());
        self.current = Some(note.id.clone());
        self.persist()?;
        tracing::debug!(id = %note.id, "created note");
        Ok(note)
    }

    /// Replaces a note's content, re-deriving the title and refreshing
    /// `updated_at`. An unknown id is a silent no-op. At millisecond clock
    /// resolution two back-to-back updates may share a timestamp.
    pub fn update(&mut self, id: &str, content: &str) -> Result<()> {
        let Some(note) = self.notes.iter_mut().find(|note| note.id == id) else {
            tracing::debug!(%id, "update for unknown note ignored");
            return Ok(());
        };
        note.title = derive_title(content);
        note.content = content.to_string();
        note.updated_at = now_millis();
        self.persist()
    }

    /// Permanently removes a note. Deleting the current note moves the
    /// selection to the new first element, or clears it when the collection
    /// is now empty. An unknown id is a silent no-op.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.notes.len();
        self.notes.retain(|note| note.id != id);
        if self.notes.len() == before {
            tracing::debug!(%id, "delete for unknown note ignored");
            return Ok(());
        }
        if self.current.as_deref() == Some(id) {
            self.current = self.notes.first().map(|note| note.id.clone());
        }
        self.persist()?;
        tracing::debug!(%id, "deleted note");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        self.persist
            .write_all(&self.notes)
            .context("persisting note collection")
    }
}
