use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use time::OffsetDateTime;

use crate::app::state::{AppState, EditorView, FocusPane, OverlayState};
use crate::editing::AutosaveStatus;
use crate::notes::NotesStore;
use crate::search::{date_label, filter_notes, snippet};

pub fn draw_app(
    frame: &mut Frame,
    store: &NotesStore,
    state: &AppState,
    list_state: &mut ListState,
) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(vertical[0]);

    draw_note_list(frame, store, state, list_state, columns[0]);
    draw_editor_pane(frame, store, state, columns[1]);
    draw_status_bar(frame, store, state, vertical[1]);

    match state.overlay() {
        Some(OverlayState::DeleteNote(overlay)) => {
            draw_confirm_overlay(
                frame,
                "Delete note",
                &format!("Delete \"{}\"? Enter confirm • Esc cancel", overlay.title),
            );
        }
        Some(OverlayState::EditTitle(overlay)) => {
            draw_input_overlay(frame, "Edit title", &overlay.input);
        }
        None => {}
    }
}

fn draw_note_list(
    frame: &mut Frame,
    store: &NotesStore,
    state: &AppState,
    list_state: &mut ListState,
    area: Rect,
) {
    let block_style = if matches!(state.focus, FocusPane::List) {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let now = OffsetDateTime::now_utc();
    let visible = filter_notes(store.notes(), state.search_query());
    let mut items = Vec::with_capacity(visible.len());
    for note in &visible {
        let pending = matches!(state.autosave_status, AutosaveStatus::Pending)
            && store.current_id() == Some(note.id.as_str());
        let mut title_spans = Vec::new();
        if pending {
            title_spans.push(Span::styled(
                "✎ ",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        title_spans.push(Span::styled(
            note.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let mut lines = vec![
            Line::from(title_spans),
            Line::from(Span::styled(
                date_label(note.updated_at, now),
                Style::default().fg(Color::Gray),
            )),
        ];
        if state.show_snippets {
            lines.push(Line::from(snippet(&note.content)));
        }
        items.push(ListItem::new(lines));
    }
    if items.is_empty() {
        if state.search_query().trim().is_empty() {
            items.push(ListItem::new("No notes yet. Press `n` to create one."));
        } else {
            items.push(ListItem::new("No notes match the search."));
        }
    }

    let title = if state.is_search_active() || !state.search_query().is_empty() {
        format!("Notes /{}", state.search_query())
    } else {
        String::from("Notes")
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(block_style),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_editor_pane(frame: &mut Frame, store: &NotesStore, state: &AppState, area: Rect) {
    let block_style = if matches!(state.focus, FocusPane::Editor) {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let title = store
        .current()
        .map(|note| note.title.clone())
        .unwrap_or_else(|| String::from("Editor"));

    let text = match state.editor() {
        Some(editor) => editor_text(editor, matches!(state.focus, FocusPane::Editor)),
        None => Text::from("Select a note, or press `n` to create one."),
    };

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(block_style),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Buffer rendered line by line with the cursor shown as a reversed cell
/// while the editor pane has focus.
fn editor_text(editor: &EditorView, focused: bool) -> Text<'static> {
    let buffer = editor.buffer();
    if !focused {
        return Text::from(buffer.to_string());
    }
    let cursor = editor.cursor().min(buffer.len());
    let cursor_style = Style::default().add_modifier(Modifier::REVERSED);

    let mut lines = Vec::new();
    let mut line_start = 0;
    for segment in buffer.split_inclusive('\n') {
        let line_end = line_start + segment.len();
        let content = segment.strip_suffix('\n').unwrap_or(segment);
        let content_end = line_start + content.len();
        if cursor >= line_start && cursor <= content_end {
            let before = content[..cursor - line_start].to_string();
            let rest = &content[cursor - line_start..];
            let mut chars = rest.chars();
            let under = chars.next().map(String::from).unwrap_or_else(|| " ".into());
            let after: String = chars.collect();
            lines.push(Line::from(vec![
                Span::raw(before),
                Span::styled(under, cursor_style),
                Span::raw(after),
            ]));
        } else {
            lines.push(Line::from(content.to_string()));
        }
        line_start = line_end;
    }
    if buffer.is_empty() || buffer.ends_with('\n') {
        if cursor == buffer.len() {
            lines.push(Line::from(Span::styled(" ", cursor_style)));
        } else {
            lines.push(Line::from(""));
        }
    }
    Text::from(lines)
}

fn draw_status_bar(frame: &mut Frame, store: &NotesStore, state: &AppState, area: Rect) {
    let mut spans = vec![Span::raw(format!("{} notes", store.len()))];
    if let Some(editor) = state.editor() {
        let (line, column) = editor.cursor_position();
        spans.push(Span::raw(format!("  •  Ln {line}, Col {column}")));
    }
    spans.push(Span::raw("  •  "));
    spans.push(autosave_span(&state.autosave_status));

    let hint = match state.focus {
        FocusPane::List => "  •  j/k move  n new  e edit  t title  d delete  / search  q quit",
        FocusPane::Editor => "  •  Esc list  Ctrl-s save",
    };
    spans.push(Span::styled(hint, Style::default().fg(Color::Gray)));

    let mut lines = vec![Line::from(spans)];
    if let Some(message) = &state.status_message {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::TOP));
    frame.render_widget(paragraph, area);
}

fn autosave_span(status: &AutosaveStatus) -> Span<'static> {
    match status {
        AutosaveStatus::Disabled => {
            Span::styled("autosave off", Style::default().fg(Color::Gray))
        }
        AutosaveStatus::Inactive | AutosaveStatus::Idle => {
            Span::styled("saved", Style::default().fg(Color::Green))
        }
        AutosaveStatus::Pending => {
            Span::styled("saving…", Style::default().fg(Color::Magenta))
        }
        AutosaveStatus::Error(message) => Span::styled(
            format!("save error: {message}"),
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

fn draw_confirm_overlay(frame: &mut Frame, title: &str, message: &str) {
    let area = centered_rect(50, 20, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(message.to_string())
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_input_overlay(frame: &mut Frame, title: &str, input: &str) {
    let area = centered_rect(60, 20, frame.size());
    frame.render_widget(Clear, area);
    let text = Text::from(vec![
        Line::from(vec![
            Span::raw(input.to_string()),
            Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)),
        ]),
        Line::from(Span::styled(
            "Enter save • Esc cancel",
            Style::default().fg(Color::Gray),
        )),
    ]);
    let paragraph = Paragraph::new(text).block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_text_marks_cursor_inside_line() {
        let mut editor = EditorView::new("n".into(), "abc".into());
        editor.cursor = 1;
        let text = editor_text(&editor, true);
        let spans = &text.lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].content.as_ref(), "b");
    }

    #[test]
    fn editor_text_appends_cursor_cell_at_end_of_buffer() {
        let editor = EditorView::new("n".into(), "line\n".into());
        let text = editor_text(&editor, true);
        assert_eq!(text.lines.len(), 2);
        assert_eq!(text.lines[1].spans[0].content.as_ref(), " ");
    }

    #[test]
    fn unfocused_editor_renders_plain_buffer() {
        let editor = EditorView::new("n".into(), "one\ntwo".into());
        let text = editor_text(&editor, false);
        assert_eq!(text.lines.len(), 2);
    }
}
