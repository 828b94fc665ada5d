use std::time::{Duration, Instant};

use anyhow::Result;

use crate::notes::{derive_title, now_millis, Note, NotesStore};

#[derive(Debug, Clone)]
pub enum CommitEvent {
    Saved { note_id: String, at: i64 },
    Failed { note_id: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveStatus {
    Disabled,
    Inactive,
    Idle,
    Pending,
    Error(String),
}

/// Debounced editor controller. One session at a time buffers the current
/// note's content and title; arming the idle timer always replaces the
/// previous deadline, so a burst of keystrokes commits exactly once.
#[derive(Debug)]
pub struct EditorController {
    enabled: bool,
    debounce: Duration,
    session: Option<Session>,
}

#[derive(Debug)]
struct Session {
    note_id: String,
    content: String,
    title: String,
    pending_commit: bool,
    dirty_since: Option<Instant>,
    last_error: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FlushKind {
    Debounced,
    Immediate,
}

impl EditorController {
    pub fn new(debounce: Duration, enabled: bool) -> Self {
        Self {
            enabled,
            debounce,
            session: None,
        }
    }

    pub fn status(&self) -> AutosaveStatus {
        if !self.enabled {
            return AutosaveStatus::Disabled;
        }
        let Some(session) = &self.session else {
            return AutosaveStatus::Inactive;
        };
        if let Some(message) = &session.last_error {
            return AutosaveStatus::Error(message.clone());
        }
        if session.pending_commit {
            AutosaveStatus::Pending
        } else {
            AutosaveStatus::Idle
        }
    }

    pub fn session_note_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.note_id.as_str())
    }

    pub fn content(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.content.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.title.as_str())
    }

    pub fn has_pending_commit(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.pending_commit)
            .unwrap_or(false)
    }

    /// Starts editing a note, reseeding the buffers from its stored state.
    /// Any uncommitted edits of the previous session are abandoned; there is
    /// no flush-on-switch.
    pub fn start_session(&mut self, note: &Note) {
        if let Some(previous) = self.session.take() {
            if previous.pending_commit && previous.note_id != note.id {
                tracing::debug!(
                    note_id = %previous.note_id,
                    "discarding pending edits on note switch"
                );
            }
        }
        self.session = Some(Session {
            note_id: note.id.clone(),
            content: note.content.clone(),
            title: note.title.clone(),
            pending_commit: false,
            dirty_since: None,
            last_error: None,
        });
    }

    pub fn end_session(&mut self) {
        self.session = None;
    }

    /// Buffers a content keystroke and re-arms the idle timer. A stale note
    /// id (session already switched away) is ignored.
    pub fn update_buffer(&mut self, note_id: &str, content: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.note_id != note_id || session.content == content {
            return;
        }
        session.content.clear();
        session.content.push_str(content);
        session.title = derive_title(content);
        session.pending_commit = true;
        session.dirty_since = Some(Instant::now());
        session.last_error = None;
    }

    /// Replaces only the buffered title; the content is untouched until the
    /// edit is confirmed with [`commit_title`](Self::commit_title).
    pub fn set_title_buffer(&mut self, title: &str) {
        if let Some(session) = self.session.as_mut() {
            session.title = title.trim().to_string();
        }
    }

    /// Cancels an in-progress title edit, restoring the title derived from
    /// the buffered content.
    pub fn revert_title(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.title = derive_title(&session.content);
        }
    }

    /// Confirms a title edit: rewrites the first line of the buffered
    /// content and commits immediately. Blank titles fall back exactly the
    /// way the store's own derivation does.
    pub fn commit_title(&mut self, store: &mut NotesStore) -> Result<Option<CommitEvent>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        session.content = replace_first_line(&session.content, &session.title);
        session.title = derive_title(&session.content);
        session.pending_commit = true;
        session.dirty_since = Some(Instant::now());
        self.flush(store, FlushKind::Immediate)
    }

    /// Commits once the debounce window has elapsed. Does nothing while
    /// autosave is disabled; explicit saves go through
    /// [`flush_now`](Self::flush_now) instead.
    pub fn poll(&mut self, store: &mut NotesStore) -> Result<Option<CommitEvent>> {
        if !self.enabled {
            return Ok(None);
        }
        self.flush(store, FlushKind::Debounced)
    }

    /// Explicit save: cancels the outstanding timer and commits immediately.
    pub fn flush_now(&mut self, store: &mut NotesStore) -> Result<Option<CommitEvent>> {
        self.flush(store, FlushKind::Immediate)
    }

    fn flush(&mut self, store: &mut NotesStore, mode: FlushKind) -> Result<Option<CommitEvent>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        if !session.pending_commit {
            return Ok(None);
        }
        if mode == FlushKind::Debounced {
            let ready = session
                .dirty_since
                .map(|since| since.elapsed() >= self.debounce)
                .unwrap_or(false);
            if !ready {
                return Ok(None);
            }
        }
        match store.update(&session.note_id, &session.content) {
            Ok(()) => {
                session.pending_commit = false;
                session.dirty_since = None;
                session.last_error = None;
                Ok(Some(CommitEvent::Saved {
                    note_id: session.note_id.clone(),
                    at: now_millis(),
                }))
            }
            Err(err) => {
                let message = format!("{err:#}");
                session.last_error = Some(message.clone());
                Ok(Some(CommitEvent::Failed {
                    note_id: session.note_id.clone(),
                    message,
                }))
            }
        }
    }
}

fn replace_first_line(content: &str, title: &str) -> String {
    match content.find('\n') {
        Some(idx) => format!("{title}{}", &content[idx..]),
        None => title.to_string(),
    }
}
