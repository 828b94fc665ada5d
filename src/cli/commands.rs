use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::Args;
use time::OffsetDateTime;

use crate::app::App;
use crate::notes::{Note, NotesStore};
use crate::search::{date_label, filter_notes, snippet};

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note body inline. If omitted, reads from stdin.
    #[arg(long)]
    pub body: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Limit the number of notes printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Query matched against titles and content, case-insensitively
    #[arg()]
    pub query: Vec<String>,
    /// Limit the number of results printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note identifier (as shown by `list`)
    pub id: String,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn new_note(mut store: NotesStore, args: NewArgs) -> Result<()> {
    let mut title = match args.title {
        Some(t) => t,
        None => prompt("Title")?,
    };
    title = title.trim().to_owned();

    let body = if let Some(body) = args.body {
        body
    } else {
        read_stdin()?.unwrap_or_default()
    };

    let content = if title.is_empty() {
        body
    } else if body.is_empty() {
        title
    } else {
        format!("{title}\n{body}")
    };

    let note = store.create().context("creating note")?;
    store
        .update(&note.id, &content)
        .context("writing note content")?;
    let saved = store.get(&note.id).context("note vanished after create")?;
    println!("Created note {} ({})", saved.id, saved.title);
    Ok(())
}

pub fn list_notes(store: &NotesStore, args: ListArgs) -> Result<()> {
    print!(
        "{}",
        format_listing(store.notes().iter().take(args.limit))
    );
    Ok(())
}

pub fn search_notes(store: &NotesStore, args: SearchArgs) -> Result<()> {
    let raw_query = args.query.join(" ");
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        bail!("search query cannot be empty");
    }
    let matches = filter_notes(store.notes(), trimmed);
    print!(
        "{}",
        format_listing(matches.into_iter().take(args.limit))
    );
    Ok(())
}

pub fn delete_note(mut store: NotesStore, args: DeleteArgs) -> Result<()> {
    let id = args.id.trim();
    let Some(note) = store.get(id) else {
        bail!("note {id} not found");
    };
    let title = note.title.clone();
    let id = id.to_string();
    store.delete(&id).context("deleting note")?;
    println!("Deleted note {id} ({title})");
    Ok(())
}

fn format_listing<'a>(notes: impl Iterator<Item = &'a Note>) -> String {
    let now = OffsetDateTime::now_utc();
    let mut out = String::new();
    let mut count = 0;
    for note in notes {
        let _ = writeln!(&mut out, "{}  {}", note.id, note.title);
        let _ = writeln!(
            &mut out,
            "    updated {}",
            date_label(note.updated_at, now)
        );
        let _ = writeln!(&mut out, "    {}", snippet(&note.content));
        out.push('\n');
        count += 1;
    }
    if count == 0 {
        out.push_str("No notes found.\n");
    }
    out
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonStore;
    use tempfile::TempDir;

    fn setup_store() -> Result<(TempDir, NotesStore)> {
        let temp = TempDir::new().context("creating temp dir")?;
        let store = NotesStore::load(JsonStore::open(temp.path().join("notes.json")))?;
        Ok((temp, store))
    }

    #[test]
    fn listing_shows_title_date_and_snippet() -> Result<()> {
        let (_temp, mut store) = setup_store()?;
        let note = store.create()?;
        store.update(&note.id, "Project plan\ntimeline overview")?;

        let output = format_listing(store.notes().iter().take(10));
        assert!(output.contains("Project plan"));
        assert!(output.contains("updated Today"));
        assert!(output.contains("timeline overview"));
        Ok(())
    }

    #[test]
    fn listing_with_no_notes_says_so() {
        let output = format_listing(std::iter::empty());
        assert_eq!(output, "No notes found.\n");
    }

    #[test]
    fn delete_command_removes_note_and_rejects_unknown_id() -> Result<()> {
        let (temp, mut store) = setup_store()?;
        let note = store.create()?;
        let id = note.id.clone();
        delete_note(
            store,
            DeleteArgs { id: id.clone() },
        )?;

        let reloaded = NotesStore::load(JsonStore::open(temp.path().join("notes.json")))?;
        assert!(reloaded.get(&id).is_none());

        let err = delete_note(reloaded, DeleteArgs { id }).unwrap_err();
        assert!(err.to_string().contains("not found"));
        Ok(())
    }
}
