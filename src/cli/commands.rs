use std::fmt::Write as _;
use std::io::{self, BufRead, Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::app::{ActionDispatcher, App, AppState, Event};
use crate::config::AppConfig;
use crate::host::{Clock, IdGenerator, PromptAnswer, Prompter, SystemClock, UuidGenerator};
use crate::storage::{KeyValueStore, StateStore};
use crate::ui::view::{self, RenderScope, ViewFlags};

#[derive(Args, Debug, Clone, Default)]
pub struct NotesArgs {
    /// Folder to list (defaults to the selected folder)
    #[arg(long)]
    pub folder: Option<String>,
    /// Only show notes whose title contains this text
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct NewFolderArgs {
    /// Folder name (prompted if omitted)
    #[arg()]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct NewNoteArgs {
    /// Name of the folder that receives the note
    #[arg(long)]
    pub folder: String,
    /// Note title (defaults to "New note")
    #[arg(long)]
    pub title: Option<String>,
    /// Note content. If omitted, reads from stdin when it is not a terminal.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeleteFolderArgs {
    /// Name of the folder to delete
    #[arg()]
    pub name: String,
    /// Skip the confirmation question
    #[arg(long)]
    pub yes: bool,
}

/// Line-based dialogs on stdin/stdout.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, message: &str) -> bool {
        match read_answer(&format!("{message} [y/N]")) {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = ?err, "reading confirmation failed");
                false
            }
        }
    }

    fn prompt(&mut self, label: &str) -> Option<String> {
        match read_answer(label) {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = ?err, "reading prompt failed");
                None
            }
        }
    }
}

fn read_answer(label: &str) -> Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    let read = io::stdin().lock().read_line(&mut input)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(['\r', '\n']).to_owned()))
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

/// Loaded state plus the collaborators needed to feed it events.
struct Session<'a, S> {
    store: &'a StateStore<S>,
    state: AppState,
    flags: ViewFlags,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl<'a, S: KeyValueStore> Session<'a, S> {
    fn open(store: &'a StateStore<S>) -> Result<Self> {
        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let ids: Box<dyn IdGenerator> = Box::new(UuidGenerator);
        let state = store
            .load(ids.as_ref(), clock.as_ref())
            .with_context(|| format!("loading stored state `{}`", store.key()))?;
        Ok(Self {
            store,
            state,
            flags: ViewFlags { menu_open: true },
            clock,
            ids,
        })
    }

    fn send(&mut self, event: Event, prompter: &mut dyn Prompter) -> Result<RenderScope> {
        let dispatcher = ActionDispatcher::new(self.store, self.clock.as_ref(), self.ids.as_ref());
        let scope = dispatcher.dispatch(&mut self.state, &mut self.flags, event, prompter)?;
        Ok(scope)
    }
}

pub fn run_tui<S: KeyValueStore>(config: Arc<AppConfig>, store: StateStore<S>) -> Result<()> {
    let mut app = App::new(config, store)?;
    app.run()
}

pub fn list_folders<S: KeyValueStore>(store: &StateStore<S>) -> Result<()> {
    print!("{}", run_folders(store)?);
    Ok(())
}

fn run_folders<S: KeyValueStore>(store: &StateStore<S>) -> Result<String> {
    let session = Session::open(store)?;
    let state = &session.state;
    let mut output = String::new();
    for row in view::render_folders(state) {
        let count = state
            .folders
            .get(&row.id)
            .map(|folder| folder.notes.len())
            .unwrap_or(0);
        let marker = if row.active { '*' } else { ' ' };
        let noun = if count == 1 { "note" } else { "notes" };
        writeln!(output, "{marker} {} ({count} {noun})", row.label)?;
    }
    Ok(output)
}

pub fn list_notes<S: KeyValueStore>(store: &StateStore<S>, args: NotesArgs) -> Result<()> {
    print!("{}", run_notes(store, &args)?);
    Ok(())
}

fn run_notes<S: KeyValueStore>(store: &StateStore<S>, args: &NotesArgs) -> Result<String> {
    let session = Session::open(store)?;
    // Listing never writes: work on a scratch copy of the selection.
    let mut state = session.state.clone();
    if let Some(name) = &args.folder {
        let Some(id) = state.folder_id_by_name(name) else {
            bail!("no folder named {name:?}");
        };
        state.select_folder(&id);
    }
    if let Some(query) = &args.search {
        state.set_search_query(query);
    }
    if state.current_folder().is_none() {
        bail!("no folder selected; pass --folder");
    }
    let region = view::render_notes(&state);
    let mut output = String::new();
    if region.rows.is_empty() {
        output.push_str("No notes.\n");
    }
    for row in region.rows {
        let marker = if row.active { '*' } else { ' ' };
        writeln!(output, "{marker} {}  [{}]", row.label, row.id)?;
    }
    Ok(output)
}

pub fn new_folder<S: KeyValueStore>(store: &StateStore<S>, args: NewFolderArgs) -> Result<()> {
    let output = match args.name {
        Some(name) => run_new_folder(store, &mut PromptAnswer::Text(name))?,
        None => run_new_folder(store, &mut StdinPrompter)?,
    };
    println!("{output}");
    Ok(())
}

fn run_new_folder<S: KeyValueStore>(
    store: &StateStore<S>,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    let mut session = Session::open(store)?;
    let scope = session
        .send(Event::NewFolder, prompter)
        .context("creating folder")?;
    if scope.is_empty() {
        return Ok("Folder creation cancelled.".to_string());
    }
    let name = session
        .state
        .current_folder()
        .map(|folder| folder.name.clone())
        .unwrap_or_default();
    Ok(format!("Created folder {name:?}"))
}

pub fn new_note<S: KeyValueStore>(store: &StateStore<S>, args: NewNoteArgs) -> Result<()> {
    let content = match args.content {
        Some(content) => Some(content),
        None => read_stdin()?,
    };
    let output = run_new_note(store, &args.folder, args.title.as_deref(), content)?;
    println!("{output}");
    Ok(())
}

fn run_new_note<S: KeyValueStore>(
    store: &StateStore<S>,
    folder: &str,
    title: Option<&str>,
    content: Option<String>,
) -> Result<String> {
    let mut session = Session::open(store)?;
    let Some(folder_id) = session.state.folder_id_by_name(folder) else {
        bail!("no folder named {folder:?}");
    };
    let mut silent = PromptAnswer::Cancelled;
    session.send(Event::SelectFolder(folder_id), &mut silent)?;
    session
        .send(Event::NewNote, &mut silent)
        .context("creating note")?;
    if let Some(title) = title {
        session.send(Event::EditTitle(title.to_owned()), &mut silent)?;
    }
    if let Some(content) = content {
        session.send(Event::EditContent(content), &mut silent)?;
    }
    let note_id = session
        .state
        .selected_note_id
        .clone()
        .context("new note was not selected")?;
    let title = session
        .state
        .current_note()
        .map(|note| note.display_title().to_string())
        .unwrap_or_default();
    Ok(format!("Created note {title:?} in {folder:?} [{note_id}]"))
}

pub fn delete_folder<S: KeyValueStore>(store: &StateStore<S>, args: DeleteFolderArgs) -> Result<()> {
    let output = if args.yes {
        run_delete_folder(store, &args.name, &mut PromptAnswer::Confirmed)?
    } else {
        run_delete_folder(store, &args.name, &mut StdinPrompter)?
    };
    println!("{output}");
    Ok(())
}

fn run_delete_folder<S: KeyValueStore>(
    store: &StateStore<S>,
    name: &str,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    let mut session = Session::open(store)?;
    let Some(folder_id) = session.state.folder_id_by_name(name) else {
        bail!("no folder named {name:?}");
    };
    let scope = session.send(Event::DeleteFolder(folder_id), prompter)?;
    if scope.is_empty() {
        Ok("Kept folder.".to_string())
    } else {
        Ok(format!("Deleted folder {name:?}"))
    }
}

pub fn export<S: KeyValueStore>(store: &StateStore<S>) -> Result<()> {
    println!("{}", run_export(store)?);
    Ok(())
}

fn run_export<S: KeyValueStore>(store: &StateStore<S>) -> Result<String> {
    let Some(raw) = store.read_raw()? else {
        bail!("nothing stored under `{}` yet", store.key());
    };
    let value: serde_json::Value =
        serde_json::from_slice(&raw).context("parsing stored state blob")?;
    serde_json::to_string_pretty(&value).context("formatting stored state")
}
