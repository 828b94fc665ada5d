use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;
use crate::notes::NotesStore;
use crate::storage::JsonStore;

pub mod commands;

use self::commands::{DeleteArgs, ListArgs, NewArgs, SearchArgs};

#[derive(Parser, Debug)]
#[command(
    name = "padnote",
    version,
    about = "Keyboard-first terminal notepad with automatic saving"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over PADNOTE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over PADNOTE_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Create a new note from the command line
    New(NewArgs),
    /// Print all notes, newest first
    List(ListArgs),
    /// Run a non-interactive search and print matching notes
    Search(SearchArgs),
    /// Permanently delete a note by id
    Delete(DeleteArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("PADNOTE_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("PADNOTE_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let store = NotesStore::load(JsonStore::open(&config.storage.notes_path))?;

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => {
            let mut app = App::new(config, store)?;
            commands::run_tui(&mut app)
        }
        Commands::New(args) => commands::new_note(store, args),
        Commands::List(args) => commands::list_notes(&store, args),
        Commands::Search(args) => commands::search_notes(&store, args),
        Commands::Delete(args) => commands::delete_note(store, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
