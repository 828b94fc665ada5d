use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::AppConfig;
use crate::editing::{CommitEvent, EditorController};
use crate::notes::NotesStore;
use crate::search::filter_notes;
use crate::ui;

pub mod state;

pub use state::{AppState, EditorView, FocusPane, OverlayState};

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    NewNote,
    EnterEdit,
    EditTitle,
    StartSearch,
    DeleteNote,
    ManualSave,
}

pub struct App {
    pub config: Arc<AppConfig>,
    store: NotesStore,
    state: AppState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
    editor_ctl: EditorController,
}

impl App {
    pub fn new(config: Arc<AppConfig>, store: NotesStore) -> Result<Self> {
        let editor_ctl = EditorController::new(
            config.auto_save.debounce_duration(),
            config.auto_save.enabled,
        );
        let mut state = AppState::new();
        state.show_snippets = config.list.show_snippets;
        state.set_autosave_status(editor_ctl.status());
        let mut app = Self {
            config,
            store,
            state,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
            editor_ctl,
        };
        app.open_current_note();
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    self.sync_list_selection();
                    ui::draw_app(frame, &self.store, &self.state, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {
                        // no-op: next draw will naturally adapt to the new size
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        // Pending edits of the current session are committed on the way out.
        if self.editor_ctl.has_pending_commit() {
            if let Err(err) = self.editor_ctl.flush_now(&mut self.store) {
                tracing::error!(?err, "final save on quit failed");
            }
        }
        Ok(())
    }

    fn sync_list_selection(&mut self) {
        let visible = self.visible_note_ids();
        let selected = self
            .store
            .current_id()
            .and_then(|id| visible.iter().position(|candidate| candidate == id));
        self.list_state.select(selected);
    }

    fn visible_note_ids(&self) -> Vec<String> {
        filter_notes(self.store.notes(), self.state.search_query())
            .into_iter()
            .map(|note| note.id.clone())
            .collect()
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.is_editing() && self.handle_editor_key(key) {
            return;
        }

        if self.state.is_search_active() {
            match key.code {
                KeyCode::Esc => {
                    self.state.cancel_search();
                    return;
                }
                KeyCode::Enter => {
                    self.state.finish_search();
                    return;
                }
                KeyCode::Backspace => {
                    self.state.search.query.pop();
                    return;
                }
                KeyCode::Char(ch)
                    if !key.modifiers.intersects(
                        KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                    ) =>
                {
                    self.state.search.query.push(ch);
                    return;
                }
                _ => {}
            }
        }

        let action = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('n')
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                Some(Action::NewNote)
            }
            KeyCode::Char('e') | KeyCode::Enter => Some(Action::EnterEdit),
            KeyCode::Char('t')
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                Some(Action::EditTitle)
            }
            KeyCode::Char('d')
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                Some(Action::DeleteNote)
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::ManualSave)
            }
            KeyCode::Char('/')
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                Some(Action::StartSearch)
            }
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }
            Action::SelectNext => self.move_selection(1),
            Action::SelectPrevious => self.move_selection(-1),
            Action::NewNote => self.handle_new_note(),
            Action::EnterEdit => self.handle_enter_edit(),
            Action::EditTitle => self.handle_edit_title(),
            Action::StartSearch => self.state.begin_search(),
            Action::DeleteNote => self.handle_delete_note(),
            Action::ManualSave => self.handle_manual_save(),
        }
    }

    fn on_tick(&mut self) {
        match self.editor_ctl.poll(&mut self.store) {
            Ok(Some(event)) => self.handle_commit_event(event),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(?err, "autosave tick errored");
            }
        }
        self.state.set_autosave_status(self.editor_ctl.status());
    }

    /// Moves the list selection within the currently visible (filtered)
    /// notes. Switching discards any pending edits of the note being left.
    fn move_selection(&mut self, delta: isize) {
        let visible = self.visible_note_ids();
        if visible.is_empty() {
            return;
        }
        let current = self
            .store
            .current_id()
            .and_then(|id| visible.iter().position(|candidate| candidate == id));
        let next = match current {
            Some(index) => {
                let len = visible.len() as isize;
                (index as isize + delta).clamp(0, len - 1) as usize
            }
            None => 0,
        };
        let next_id = visible[next].clone();
        if self.store.current_id() == Some(next_id.as_str()) {
            return;
        }
        self.store.select(&next_id);
        self.open_current_note();
    }

    fn open_current_note(&mut self) {
        let Some(note) = self.store.current().cloned() else {
            self.editor_ctl.end_session();
            self.state.close_editor();
            self.state.set_autosave_status(self.editor_ctl.status());
            return;
        };
        self.editor_ctl.start_session(&note);
        self.state.begin_editor(note.id, note.content);
        self.state.set_autosave_status(self.editor_ctl.status());
    }

    fn handle_new_note(&mut self) {
        match self.store.create() {
            Ok(note) => {
                self.state.cancel_search();
                self.editor_ctl.start_session(&note);
                self.state.begin_editor(note.id, note.content);
                self.state.focus = FocusPane::Editor;
                self.state
                    .set_status_message(Some("New note: start typing, Esc for the list"));
            }
            Err(err) => {
                tracing::error!(?err, "failed to create note");
                self.state.set_status_message(Some("Failed to create note"));
            }
        }
        self.state.set_autosave_status(self.editor_ctl.status());
    }

    fn handle_enter_edit(&mut self) {
        if self.store.current().is_none() {
            self.state.set_status_message(Some("No note selected"));
            return;
        }
        if self.state.editor().is_none() {
            self.open_current_note();
        }
        self.state.focus = FocusPane::Editor;
        self.state
            .set_status_message(Some("Editing: Esc back to list • Ctrl-s save now"));
    }

    fn handle_edit_title(&mut self) {
        let Some(note) = self.store.current() else {
            self.state.set_status_message(Some("No note selected"));
            return;
        };
        self.state.open_edit_title(note.title.clone());
        self.state
            .set_status_message(Some("Edit title: Enter save • Esc cancel"));
    }

    fn handle_delete_note(&mut self) {
        let Some(note) = self.store.current() else {
            self.state.set_status_message(Some("No note selected"));
            return;
        };
        self.state
            .open_delete_note(note.id.clone(), note.title.clone());
        self.state
            .set_status_message(Some("Delete note: Enter confirm • Esc cancel"));
    }

    fn handle_manual_save(&mut self) {
        match self.editor_ctl.flush_now(&mut self.store) {
            Ok(Some(event)) => {
                let saved = matches!(event, CommitEvent::Saved { .. });
                self.handle_commit_event(event);
                if saved {
                    self.state.set_status_message(Some("Changes saved"));
                }
            }
            Ok(None) => {
                self.state.set_status_message(Some("No changes to save"));
            }
            Err(err) => {
                tracing::error!(?err, "manual save failed");
                self.state
                    .set_status_message(Some("Manual save failed; see logs"));
            }
        }
        self.state.set_autosave_status(self.editor_ctl.status());
    }

    fn handle_commit_event(&mut self, event: CommitEvent) {
        match event {
            CommitEvent::Saved { note_id, .. } => {
                tracing::debug!(%note_id, "autosave committed");
            }
            CommitEvent::Failed { note_id, message } => {
                tracing::warn!(%note_id, %message, "autosave error");
                self.state
                    .set_status_message(Some(format!("Autosave error: {message}")));
            }
        }
        self.state.set_autosave_status(self.editor_ctl.status());
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        match self.state.overlay() {
            Some(OverlayState::DeleteNote(_)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    KeyCode::Enter => {
                        self.submit_delete_note();
                    }
                    _ => {}
                }
                true
            }
            Some(OverlayState::EditTitle(_)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.editor_ctl.revert_title();
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Title unchanged"));
                    }
                    KeyCode::Enter => {
                        self.submit_edit_title();
                    }
                    KeyCode::Backspace => {
                        if let Some(overlay) = self.state.edit_title_overlay_mut() {
                            overlay.input.pop();
                        }
                    }
                    KeyCode::Char(ch)
                        if !key.modifiers.intersects(
                            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                        ) =>
                    {
                        if let Some(overlay) = self.state.edit_title_overlay_mut() {
                            if overlay.input.len() < 120 {
                                overlay.input.push(ch);
                            }
                        }
                    }
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn submit_delete_note(&mut self) {
        let Some(note_id) = self
            .state
            .delete_note_overlay()
            .map(|overlay| overlay.note_id.clone())
        else {
            return;
        };
        if self.editor_ctl.session_note_id() == Some(note_id.as_str()) {
            self.editor_ctl.end_session();
        }
        match self.store.delete(&note_id) {
            Ok(()) => {
                self.state.close_overlay();
                self.open_current_note();
                self.state.focus = FocusPane::List;
                self.state.set_status_message(Some("Note deleted"));
            }
            Err(err) => {
                tracing::error!(?err, "failed to delete note");
                self.state.set_status_message(Some("Failed to delete note"));
            }
        }
    }

    fn submit_edit_title(&mut self) {
        let Some(input) = self
            .state
            .edit_title_overlay()
            .map(|overlay| overlay.input.clone())
        else {
            return;
        };
        self.editor_ctl.set_title_buffer(&input);
        match self.editor_ctl.commit_title(&mut self.store) {
            Ok(event) => {
                if let Some(event) = event {
                    self.handle_commit_event(event);
                }
                self.state.close_overlay();
                // Reflect the rewritten first line in the visible buffer.
                // The old byte offset may not be a char boundary in the new
                // text, so the cursor moves to the end instead of clamping.
                if let (Some(content), Some(editor)) =
                    (self.editor_ctl.content(), self.state.editor_mut())
                {
                    editor.buffer = content.to_string();
                    editor.cursor = editor.buffer.len();
                }
                self.state.set_status_message(Some("Title updated"));
            }
            Err(err) => {
                tracing::error!(?err, "failed to update title");
                self.state.set_status_message(Some("Failed to update title"));
            }
        }
        self.state.set_autosave_status(self.editor_ctl.status());
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('s') = key.code {
                self.handle_manual_save();
                return true;
            }
        }

        match key.code {
            KeyCode::Esc => {
                // Back to the list without forcing a commit; the debounce
                // timer keeps running and poll() finishes the save.
                self.state.focus = FocusPane::List;
                self.state.set_status_message(None::<String>);
                true
            }
            KeyCode::Enter => {
                self.apply_editor_change(|editor| editor.insert_newline());
                true
            }
            KeyCode::Backspace => {
                self.apply_editor_change(|editor| editor.backspace());
                true
            }
            KeyCode::Delete => {
                self.apply_editor_change(|editor| editor.delete());
                true
            }
            KeyCode::Tab => {
                self.apply_editor_change(|editor| editor.insert_char('\t'));
                true
            }
            KeyCode::Char(ch)
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                self.apply_editor_change(|editor| editor.insert_char(ch));
                true
            }
            KeyCode::Left => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_left();
                }
                true
            }
            KeyCode::Right => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_right();
                }
                true
            }
            KeyCode::Up => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_up();
                }
                true
            }
            KeyCode::Down => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_down();
                }
                true
            }
            KeyCode::Home => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_home();
                }
                true
            }
            KeyCode::End => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_end();
                }
                true
            }
            _ => false,
        }
    }

    fn apply_editor_change<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut EditorView) -> bool,
    {
        let changed = {
            if let Some(editor) = self.state.editor_mut() {
                f(editor)
            } else {
                return false;
            }
        };
        if changed {
            self.queue_autosave_update();
        }
        changed
    }

    fn queue_autosave_update(&mut self) {
        let Some(editor) = self.state.editor() else {
            return;
        };
        let note_id = editor.note_id.clone();
        let content = editor.buffer().to_string();
        self.editor_ctl.update_buffer(&note_id, &content);
        self.state.set_autosave_status(self.editor_ctl.status());
    }

    #[cfg(test)]
    fn store(&self) -> &NotesStore {
        &self.store
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStore;
    use crossterm::event::KeyEvent;
    use tempfile::TempDir;

    fn test_app(temp: &TempDir) -> Result<App> {
        let store = NotesStore::load(JsonStore::open(temp.path().join("notes.json")))?;
        let mut config = AppConfig::default();
        config.auto_save.debounce_ms = 0;
        App::new(Arc::new(config), store)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn press_ctrl(app: &mut App, ch: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL));
    }

    #[test]
    fn typing_in_editor_commits_on_tick() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('i'));

        app.on_tick();
        let note = app.store().current().expect("note selected");
        assert_eq!(note.content, "hi");
        assert_eq!(note.title, "hi");
        Ok(())
    }

    #[test]
    fn ctrl_s_saves_without_waiting_for_tick() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        press(&mut app, KeyCode::Char('n'));
        press(&mut app, KeyCode::Char('x'));
        press_ctrl(&mut app, 's');

        let note = app.store().current().expect("note selected");
        assert_eq!(note.content, "x");
        Ok(())
    }

    #[test]
    fn delete_confirmation_removes_current_note() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        // The welcome note is selected; list focus on startup.
        press(&mut app, KeyCode::Char('d'));
        assert!(app.state.delete_note_overlay().is_some());
        press(&mut app, KeyCode::Enter);
        assert!(app.store().is_empty());
        assert!(app.state.editor().is_none());
        Ok(())
    }

    #[test]
    fn delete_can_be_canceled() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Esc);
        assert!(app.state.overlay().is_none());
        assert_eq!(app.store().len(), 1);
        Ok(())
    }

    #[test]
    fn title_overlay_rewrites_first_line() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        press(&mut app, KeyCode::Char('t'));
        // Clear the seeded title and type a new one.
        for _ in 0..40 {
            press(&mut app, KeyCode::Backspace);
        }
        for ch in "Renamed".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press(&mut app, KeyCode::Enter);

        let note = app.store().current().expect("note selected");
        assert_eq!(note.title, "Renamed");
        assert!(note.content.starts_with("Renamed\n"));
        Ok(())
    }

    #[test]
    fn typing_after_multibyte_title_rewrite_stays_on_char_boundary() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        press(&mut app, KeyCode::Char('n'));
        for ch in "héllo".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press_ctrl(&mut app, 's');
        // Park the cursor mid-buffer, then shrink the content via a title
        // rewrite ending in a multi-byte character.
        for _ in 0..3 {
            press(&mut app, KeyCode::Left);
        }
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('t'));
        for _ in 0..10 {
            press(&mut app, KeyCode::Backspace);
        }
        for ch in "ab€".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Char('x'));
        app.on_tick();

        let note = app.store().current().expect("note selected");
        assert_eq!(note.content, "ab€x");
        Ok(())
    }

    #[test]
    fn search_input_narrows_visible_notes() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        press(&mut app, KeyCode::Char('n'));
        for ch in "Groceries".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press_ctrl(&mut app, 's');
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('/'));
        for ch in "welcome".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        let visible = app.visible_note_ids();
        assert_eq!(visible.len(), 1);
        let note = app.store().get(&visible[0]).expect("note present");
        assert_eq!(note.title, "Welcome to Padnote");
        Ok(())
    }

    #[test]
    fn switching_notes_in_list_discards_unsaved_edits() -> Result<()> {
        let temp = TempDir::new()?;
        let mut app = test_app(&temp)?;
        press(&mut app, KeyCode::Char('n'));
        for ch in "Second note".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press_ctrl(&mut app, 's');
        // Type more without saving, then move to the welcome note.
        press(&mut app, KeyCode::Char('!'));
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('j'));

        app.on_tick();
        let second = app
            .store()
            .notes()
            .iter()
            .find(|note| note.title.starts_with("Second"))
            .expect("second note present");
        assert_eq!(second.content, "Second note");
        Ok(())
    }
}
