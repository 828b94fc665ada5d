use unicode_segmentation::UnicodeSegmentation;

use crate::editing::AutosaveStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    List,
    Editor,
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub active: bool,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct DeleteNoteOverlay {
    pub note_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct EditTitleOverlay {
    pub input: String,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    DeleteNote(DeleteNoteOverlay),
    EditTitle(EditTitleOverlay),
}

/// Cursor-bearing view over the current note's content. The buffer here is
/// the source the editor controller commits from; the store only sees
/// committed content.
#[derive(Debug, Clone)]
pub struct EditorView {
    pub note_id: String,
    pub buffer: String,
    pub cursor: usize,
    preferred_column: Option<usize>,
}

impl EditorView {
    pub fn new(note_id: String, buffer: String) -> Self {
        let cursor = buffer.len();
        Self {
            note_id,
            buffer,
            cursor,
            preferred_column: None,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.buffer.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
        self.preferred_column = None;
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        self.buffer.insert(self.cursor, '\n');
        self.cursor += 1;
        self.preferred_column = Some(0);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        self.preferred_column = None;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        self.preferred_column = None;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.preferred_column = None;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        self.preferred_column = None;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let line_start = line_start(&self.buffer, self.cursor);
        if self.cursor == line_start {
            return false;
        }
        self.cursor = line_start;
        self.preferred_column = Some(0);
        true
    }

    pub fn move_end(&mut self) -> bool {
        let line_end = line_end(&self.buffer, self.cursor);
        if self.cursor == line_end {
            return false;
        }
        self.cursor = line_end;
        self.preferred_column = None;
        true
    }

    pub fn move_up(&mut self) -> bool {
        let current_line_start = line_start(&self.buffer, self.cursor);
        let current_column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, current_line_start, self.cursor));
        if current_line_start == 0 {
            if self.cursor == 0 {
                return false;
            }
            self.cursor = 0;
            self.preferred_column = Some(current_column);
            return true;
        }
        let prev_line_end = current_line_start.saturating_sub(1);
        let prev_line_start = line_start(&self.buffer, prev_line_end);
        let target = position_for_column(&self.buffer, prev_line_start, current_column);
        if self.cursor == target {
            return false;
        }
        self.cursor = target;
        self.preferred_column = Some(current_column);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let current_line_start = line_start(&self.buffer, self.cursor);
        let current_column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, current_line_start, self.cursor));
        let current_line_end = line_end(&self.buffer, self.cursor);
        if current_line_end == self.buffer.len() {
            if self.cursor == self.buffer.len() {
                return false;
            }
            self.cursor = self.buffer.len();
            self.preferred_column = Some(current_column);
            return true;
        }
        let next_line_start = current_line_end + 1;
        let target = position_for_column(&self.buffer, next_line_start, current_column);
        if self.cursor == target {
            return false;
        }
        self.cursor = target;
        self.preferred_column = Some(current_column);
        true
    }

    /// Line/column position for the status bar, 1-based.
    pub fn cursor_position(&self) -> (usize, usize) {
        let line = self.buffer[..self.cursor].matches('\n').count() + 1;
        let column = column_at(&self.buffer, line_start(&self.buffer, self.cursor), self.cursor) + 1;
        (line, column)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub focus: FocusPane,
    pub search: SearchState,
    pub status_message: Option<String>,
    pub overlay: Option<OverlayState>,
    pub editor: Option<EditorView>,
    pub autosave_status: AutosaveStatus,
    pub show_snippets: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            focus: FocusPane::List,
            search: SearchState::default(),
            status_message: None,
            overlay: None,
            editor: None,
            autosave_status: AutosaveStatus::Inactive,
            show_snippets: true,
        }
    }

    pub fn editor(&self) -> Option<&EditorView> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorView> {
        self.editor.as_mut()
    }

    pub fn is_editing(&self) -> bool {
        self.focus == FocusPane::Editor && self.editor.is_some()
    }

    pub fn begin_editor(&mut self, note_id: String, buffer: String) {
        self.editor = Some(EditorView::new(note_id, buffer));
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    pub fn set_autosave_status(&mut self, status: AutosaveStatus) {
        self.autosave_status = status;
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn is_search_active(&self) -> bool {
        self.search.active
    }

    pub fn search_query(&self) -> &str {
        &self.search.query
    }

    pub fn begin_search(&mut self) {
        self.search.active = true;
        self.focus = FocusPane::List;
    }

    pub fn finish_search(&mut self) {
        self.search.active = false;
    }

    pub fn cancel_search(&mut self) {
        self.search.active = false;
        self.search.query.clear();
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn open_delete_note(&mut self, note_id: String, title: String) {
        self.overlay = Some(OverlayState::DeleteNote(DeleteNoteOverlay {
            note_id,
            title,
        }));
    }

    pub fn open_edit_title(&mut self, current_title: String) {
        self.overlay = Some(OverlayState::EditTitle(EditTitleOverlay {
            input: current_title,
        }));
    }

    pub fn delete_note_overlay(&self) -> Option<&DeleteNoteOverlay> {
        match self.overlay() {
            Some(OverlayState::DeleteNote(ref overlay)) => Some(overlay),
            _ => None,
        }
    }

    pub fn edit_title_overlay(&self) -> Option<&EditTitleOverlay> {
        match self.overlay() {
            Some(OverlayState::EditTitle(ref overlay)) => Some(overlay),
            _ => None,
        }
    }

    pub fn edit_title_overlay_mut(&mut self) -> Option<&mut EditTitleOverlay> {
        match self.overlay.as_mut() {
            Some(OverlayState::EditTitle(ref mut overlay)) => Some(overlay),
            _ => None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut last = 0;
    for (idx, _) in text[..cursor].grapheme_indices(true) {
        last = idx;
    }
    last
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    let mut iter = text[cursor..].graphemes(true);
    if let Some(grapheme) = iter.next() {
        cursor + grapheme.len()
    } else {
        text.len()
    }
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or_else(|| text.len())
}

fn column_at(text: &str, line_start: usize, cursor: usize) -> usize {
    text[line_start..cursor].graphemes(true).count()
}

fn position_for_column(text: &str, line_start: usize, column: usize) -> usize {
    let line_end = line_end(text, line_start);
    let mut position = line_start;
    let mut count = 0;
    for grapheme in text[line_start..line_end].graphemes(true) {
        if count >= column {
            break;
        }
        position += grapheme.len();
        count += 1;
    }
    if column > count {
        line_end
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backspace_removes_whole_grapheme() {
        let mut editor = EditorView::new("n".into(), "ae\u{301}".into());
        assert!(editor.backspace());
        assert_eq!(editor.buffer(), "a");
        assert!(editor.backspace());
        assert_eq!(editor.buffer(), "");
        assert!(!editor.backspace());
    }

    #[test]
    fn vertical_movement_keeps_preferred_column() {
        let mut editor = EditorView::new("n".into(), "long first line\nab\nanother long".into());
        editor.move_end();
        assert!(editor.move_up());
        assert!(editor.move_up());
        // Landed on short line, then back to a long one at the old column.
        assert!(editor.move_down());
        let (line, _) = editor.cursor_position();
        assert_eq!(line, 2);
        assert!(editor.move_down());
        let (line, column) = editor.cursor_position();
        assert_eq!(line, 3);
        assert!(column > 3);
    }

    #[test]
    fn cursor_position_is_one_based() {
        let editor = EditorView::new("n".into(), "ab\ncd".into());
        assert_eq!(editor.cursor_position(), (2, 3));
        let fresh = EditorView::new("n".into(), String::new());
        assert_eq!(fresh.cursor_position(), (1, 1));
    }

    #[test]
    fn home_and_end_stay_on_line() {
        let mut editor = EditorView::new("n".into(), "first\nsecond".into());
        assert!(editor.move_home());
        assert_eq!(editor.cursor, 6);
        assert!(editor.move_end());
        assert_eq!(editor.cursor, 12);
    }
}
