use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use strum::Display;

use crate::config::AppConfig;
use crate::host::{Clock, IdGenerator, PromptAnswer, SystemClock, UuidGenerator};
use crate::storage::{KeyValueStore, StateStore};
use crate::ui;
use crate::ui::view::{self, RenderScope, View, ViewFlags};

pub mod actions;
pub mod editor;
pub mod state;

pub use actions::{ActionDispatcher, Dialog, Event};
pub use editor::TextField;
pub use state::{AppState, Folder, FolderId, Note, NoteId};

const FOCUS_ORDER: [FocusPane; 5] = [
    FocusPane::Folders,
    FocusPane::Notes,
    FocusPane::Search,
    FocusPane::Title,
    FocusPane::Content,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FocusPane {
    Folders,
    Notes,
    Search,
    Title,
    Content,
}

/// Modal dialog holding the event it will release once answered.
#[derive(Debug, Clone)]
pub enum Overlay {
    Confirm {
        event: Event,
        message: String,
    },
    Prompt {
        event: Event,
        label: &'static str,
        input: TextField,
    },
}

pub struct App<S> {
    pub config: Arc<AppConfig>,
    store: StateStore<S>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    state: AppState,
    flags: ViewFlags,
    view: View,
    focus: FocusPane,
    title: TextField,
    content: TextField,
    search: TextField,
    overlay: Option<Overlay>,
    status_message: Option<String>,
    should_quit: bool,
    tick_rate: Duration,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(config: Arc<AppConfig>, store: StateStore<S>) -> Result<Self> {
        Self::with_host(config, store, Box::new(SystemClock), Box::new(UuidGenerator))
    }

    pub fn with_host(
        config: Arc<AppConfig>,
        store: StateStore<S>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self> {
        let state = store
            .load(ids.as_ref(), clock.as_ref())
            .with_context(|| format!("loading stored state `{}`", store.key()))?;
        let view = view::render(&state);
        let focus = if state.current_note().is_some() {
            FocusPane::Notes
        } else {
            FocusPane::Folders
        };
        let tick_rate = Duration::from_millis(config.ui.tick_rate_ms);
        let flags = ViewFlags {
            menu_open: config.ui.show_folders,
        };
        let mut app = Self {
            config,
            store,
            clock,
            ids,
            state,
            flags,
            view,
            focus,
            title: TextField::single_line(),
            content: TextField::multi_line(),
            search: TextField::single_line(),
            overlay: None,
            status_message: None,
            should_quit: false,
            tick_rate,
        };
        app.search.reset(&app.view.notes.query);
        app.sync_editor_fields();
        app.ensure_focus_visible();
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn flags(&self) -> ViewFlags {
        self.flags
    }

    pub fn focus(&self) -> FocusPane {
        self.focus
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn screen(&self) -> ui::Screen<'_> {
        ui::Screen {
            view: &self.view,
            flags: self.flags,
            focus: self.focus,
            title: &self.title,
            content: &self.content,
            search: &self.search,
            filter: self.state.filter(),
            overlay: self.overlay.as_ref(),
            status: self.status_message.as_deref(),
            palette: self.config.theme.palette(),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let screen = self.screen();
            terminal
                .draw(|frame| ui::draw_app(frame, &screen))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let TermEvent::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.overlay.is_some() {
            self.handle_overlay_key(key);
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.cycle_focus(1);
                return;
            }
            KeyCode::BackTab => {
                self.cycle_focus(-1);
                return;
            }
            _ => {}
        }

        match self.focus {
            FocusPane::Folders | FocusPane::Notes => self.handle_list_key(key),
            FocusPane::Search | FocusPane::Title | FocusPane::Content => {
                self.handle_field_key(key)
            }
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return;
        }
        self.status_message = None;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Enter => {
                self.focus = match self.focus {
                    FocusPane::Folders => FocusPane::Notes,
                    _ if self.view.editor.title.enabled => FocusPane::Title,
                    other => other,
                };
            }
            KeyCode::Char('e') if self.view.editor.content.enabled => {
                self.focus = FocusPane::Content;
            }
            KeyCode::Char('n') => self.open_dialog(Event::NewNote),
            KeyCode::Char('N') => self.open_dialog(Event::NewFolder),
            KeyCode::Char('d') => {
                if let Some(event) = self.delete_event_for_focus() {
                    self.open_dialog(event);
                }
            }
            KeyCode::Char('/') => self.focus = FocusPane::Search,
            KeyCode::Char('m') | KeyCode::Char('M') => self.open_dialog(Event::ToggleMenu),
            _ => {}
        }
    }

    fn handle_field_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.focus = FocusPane::Notes;
            self.ensure_focus_visible();
            return;
        }
        let pane = self.focus;
        let enabled = match pane {
            FocusPane::Title => self.view.editor.title.enabled,
            FocusPane::Content => self.view.editor.content.enabled,
            _ => true,
        };
        if !enabled {
            return;
        }
        let field = match pane {
            FocusPane::Title => &mut self.title,
            FocusPane::Content => &mut self.content,
            _ => &mut self.search,
        };
        let changed = if key.code == KeyCode::Enter {
            field.insert_char('\n')
        } else {
            edit_field(field, key)
        };
        if !changed {
            return;
        }
        let text = field.buffer().to_owned();
        let event = match pane {
            FocusPane::Title => Event::EditTitle(text),
            FocusPane::Content => Event::EditContent(text),
            _ => Event::EditSearch(text),
        };
        self.dispatch(event, PromptAnswer::Cancelled);
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        let Some(overlay) = self.overlay.take() else {
            return;
        };
        match overlay {
            Overlay::Confirm { event, message } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.dispatch(event, PromptAnswer::Confirmed)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.dispatch(event, PromptAnswer::Declined)
                }
                _ => self.overlay = Some(Overlay::Confirm { event, message }),
            },
            Overlay::Prompt {
                event,
                label,
                mut input,
            } => match key.code {
                KeyCode::Enter => {
                    let answer = PromptAnswer::Text(input.buffer().to_owned());
                    self.dispatch(event, answer)
                }
                KeyCode::Esc => self.dispatch(event, PromptAnswer::Cancelled),
                _ => {
                    edit_field(&mut input, key);
                    self.overlay = Some(Overlay::Prompt {
                        event,
                        label,
                        input,
                    });
                }
            },
        }
    }

    fn open_dialog(&mut self, event: Event) {
        match event.dialog(&self.state) {
            Some(Dialog::Confirm(message)) => {
                self.overlay = Some(Overlay::Confirm { event, message });
            }
            Some(Dialog::Prompt(label)) => {
                self.overlay = Some(Overlay::Prompt {
                    event,
                    label,
                    input: TextField::single_line(),
                });
            }
            None => self.dispatch(event, PromptAnswer::Cancelled),
        }
    }

    fn dispatch(&mut self, event: Event, mut answer: PromptAnswer) {
        let dispatcher = ActionDispatcher::new(&self.store, self.clock.as_ref(), self.ids.as_ref());
        match dispatcher.dispatch(&mut self.state, &mut self.flags, event, &mut answer) {
            Ok(scope) => {
                self.status_message = None;
                self.apply_scope(scope);
            }
            Err(err) => {
                tracing::error!(error = ?err, "failed to persist state");
                self.status_message = Some(format!("Not saved: {err}"));
                // The mutation was applied before the write failed, so any
                // region may be stale.
                self.apply_scope(RenderScope::FULL);
            }
        }
    }

    fn apply_scope(&mut self, scope: RenderScope) {
        self.view.refresh(&self.state, scope);
        if scope.contains(RenderScope::EDITOR) {
            self.sync_editor_fields();
        }
        self.ensure_focus_visible();
    }

    /// Fields already holding the region's text keep their cursor.
    fn sync_editor_fields(&mut self) {
        if self.title.buffer() != self.view.editor.title.value {
            self.title.reset(&self.view.editor.title.value);
        }
        if self.content.buffer() != self.view.editor.content.value {
            self.content.reset(&self.view.editor.content.value);
        }
    }

    fn ensure_focus_visible(&mut self) {
        if self.focus == FocusPane::Folders && !self.flags.menu_open {
            self.focus = FocusPane::Notes;
        }
    }

    fn cycle_focus(&mut self, delta: isize) {
        let len = FOCUS_ORDER.len() as isize;
        let mut index = FOCUS_ORDER
            .iter()
            .position(|pane| *pane == self.focus)
            .unwrap_or(0) as isize;
        for _ in 0..len {
            index = (index + delta).rem_euclid(len);
            let candidate = FOCUS_ORDER[index as usize];
            if self.can_focus(candidate) {
                self.focus = candidate;
                return;
            }
        }
    }

    fn can_focus(&self, pane: FocusPane) -> bool {
        match pane {
            FocusPane::Folders => self.flags.menu_open,
            FocusPane::Title => self.view.editor.title.enabled,
            FocusPane::Content => self.view.editor.content.enabled,
            FocusPane::Notes | FocusPane::Search => true,
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let event = match self.focus {
            FocusPane::Folders => {
                let rows = &self.view.folders;
                let current = rows.iter().position(|row| row.active);
                step(current, rows.len(), delta).map(|idx| Event::SelectFolder(rows[idx].id.clone()))
            }
            FocusPane::Notes => {
                let rows = &self.view.notes.rows;
                let current = rows.iter().position(|row| row.active);
                step(current, rows.len(), delta).map(|idx| Event::SelectNote(rows[idx].id.clone()))
            }
            _ => None,
        };
        if let Some(event) = event {
            self.dispatch(event, PromptAnswer::Cancelled);
        }
    }

    fn delete_event_for_focus(&self) -> Option<Event> {
        match self.focus {
            FocusPane::Folders => self
                .view
                .folders
                .iter()
                .find(|row| row.active)
                .map(|row| Event::DeleteFolder(row.id.clone())),
            FocusPane::Notes => self
                .view
                .notes
                .rows
                .iter()
                .find(|row| row.active)
                .map(|row| Event::DeleteNote(row.id.clone())),
            _ => None,
        }
    }
}

fn step(current: Option<usize>, len: usize, delta: isize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let target = match current {
        Some(idx) => (idx as isize + delta).clamp(0, len as isize - 1) as usize,
        None => 0,
    };
    if Some(target) == current {
        None
    } else {
        Some(target)
    }
}

fn edit_field(field: &mut TextField, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(ch)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
        {
            field.insert_char(ch)
        }
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => {
            field.move_left();
            false
        }
        KeyCode::Right => {
            field.move_right();
            false
        }
        KeyCode::Home => {
            field.move_home();
            false
        }
        KeyCode::End => {
            field.move_end();
            false
        }
        _ => false,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("creating terminal backend")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leaving alternate screen")?;
    terminal.show_cursor().context("restoring cursor")?;
    Ok(())
}
