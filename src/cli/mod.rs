use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage::{self, KeyValueStore, MemoryStore, StateStore};

pub mod commands;

use self::commands::{DeleteFolderArgs, NewFolderArgs, NewNoteArgs, NotesArgs};

#[derive(Parser, Debug)]
#[command(
    name = "folder-notes",
    version,
    about = "Folders of text notes in the terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over FOLDER_NOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over FOLDER_NOTES_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Work on an in-memory copy of the stored state; nothing is written
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// List folders in display order
    Folders,
    /// List the notes of a folder as the note panel shows them
    Notes(NotesArgs),
    /// Create a folder and select it
    NewFolder(NewFolderArgs),
    /// Create a note inside a folder
    NewNote(NewNoteArgs),
    /// Delete a folder and every note inside it
    DeleteFolder(DeleteFolderArgs),
    /// Print the stored state blob as JSON
    Export,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);
    let log_file = matches!(command, Commands::Tui).then(|| paths.log_file());
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = Arc::new(loader.load_or_init()?);
    let backend = storage::init(&paths, &config.storage)?;
    let key = config.storage.state_key.clone();

    if cli.dry_run {
        let memory = MemoryStore::copy_of(&backend, &key)
            .with_context(|| format!("copying `{key}` for a dry run"))?;
        tracing::info!(key = %key, "dry run, changes stay in memory");
        return run_command(command, config, StateStore::new(memory, key));
    }
    run_command(command, config, StateStore::new(backend, key))
}

fn run_command<S: KeyValueStore>(
    command: Commands,
    config: Arc<AppConfig>,
    store: StateStore<S>,
) -> Result<()> {
    match command {
        Commands::Tui => commands::run_tui(config, store),
        Commands::Folders => commands::list_folders(&store),
        Commands::Notes(args) => commands::list_notes(&store, args),
        Commands::NewFolder(args) => commands::new_folder(&store, args),
        Commands::NewNote(args) => commands::new_note(&store, args),
        Commands::DeleteFolder(args) => commands::delete_folder(&store, args),
        Commands::Export => commands::export(&store),
    }
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_timer(UtcTime::rfc_3339())
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            None => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}
