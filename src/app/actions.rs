use strum::IntoStaticStr;

use crate::app::state::{AppState, FolderId, NoteId, TitleTarget};
use crate::host::{Clock, IdGenerator, Prompter};
use crate::storage::{KeyValueStore, StateStore, StoreError};
use crate::ui::view::{RenderScope, ViewFlags};

pub const FOLDER_NAME_PROMPT: &str = "Folder name";

/// User interactions, keyed by the stable id of the row they target.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Event {
    SelectFolder(FolderId),
    DeleteFolder(FolderId),
    NewFolder,
    SelectNote(NoteId),
    DeleteNote(NoteId),
    NewNote,
    EditTitle(String),
    EditContent(String),
    EditSearch(String),
    ToggleMenu,
}

/// The dialog an event will raise before it can take effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Confirm(String),
    Prompt(&'static str),
}

impl Event {
    pub fn dialog(&self, state: &AppState) -> Option<Dialog> {
        match self {
            Event::DeleteFolder(id) => state
                .folders
                .get(id)
                .map(|folder| Dialog::Confirm(delete_folder_message(&folder.name))),
            Event::DeleteNote(id) => state
                .current_folder()
                .and_then(|folder| folder.notes.get(id))
                .map(|note| Dialog::Confirm(delete_note_message(&note.title))),
            Event::NewFolder => Some(Dialog::Prompt(FOLDER_NAME_PROMPT)),
            _ => None,
        }
    }
}

fn delete_folder_message(name: &str) -> String {
    format!("Delete folder \"{name}\"? All notes inside will be lost.")
}

fn delete_note_message(title: &str) -> String {
    format!("Delete note \"{title}\"?")
}

/// Applies events to the state, persists every change and reports which
/// regions need rebuilding.
pub struct ActionDispatcher<'a, S> {
    store: &'a StateStore<S>,
    clock: &'a dyn Clock,
    ids: &'a dyn IdGenerator,
}

impl<'a, S: KeyValueStore> ActionDispatcher<'a, S> {
    pub fn new(store: &'a StateStore<S>, clock: &'a dyn Clock, ids: &'a dyn IdGenerator) -> Self {
        Self { store, clock, ids }
    }

    /// The in-memory mutation is kept even when persisting it fails.
    pub fn dispatch(
        &self,
        state: &mut AppState,
        flags: &mut ViewFlags,
        event: Event,
        prompter: &mut dyn Prompter,
    ) -> Result<RenderScope, StoreError> {
        let kind: &'static str = (&event).into();
        tracing::debug!(event = kind, "dispatching");
        match event {
            Event::SelectFolder(id) => {
                if !state.select_folder(&id) {
                    return Ok(RenderScope::empty());
                }
                self.persist(state, RenderScope::FULL)
            }
            Event::DeleteFolder(id) => {
                let Some(folder) = state.folders.get(&id) else {
                    return Ok(RenderScope::empty());
                };
                if !prompter.confirm(&delete_folder_message(&folder.name)) {
                    return Ok(RenderScope::empty());
                }
                if let Some(removed) = state.remove_folder(&id) {
                    tracing::info!(folder = %id, notes = removed.notes.len(), "folder deleted");
                }
                self.persist(state, RenderScope::FULL)
            }
            Event::NewFolder => {
                let Some(name) = prompter
                    .prompt(FOLDER_NAME_PROMPT)
                    .filter(|name| !name.is_empty())
                else {
                    return Ok(RenderScope::empty());
                };
                let id = FolderId::new(self.ids.next_id());
                tracing::info!(folder = %id, "folder created");
                state.insert_folder(id, name);
                self.persist(state, RenderScope::FULL)
            }
            Event::SelectNote(id) => {
                if !state.select_note(&id) {
                    return Ok(RenderScope::empty());
                }
                self.persist(state, RenderScope::FULL)
            }
            Event::DeleteNote(id) => {
                let Some(note) = state
                    .current_folder()
                    .and_then(|folder| folder.notes.get(&id))
                else {
                    return Ok(RenderScope::empty());
                };
                if !prompter.confirm(&delete_note_message(&note.title)) {
                    return Ok(RenderScope::empty());
                }
                state.remove_note(&id);
                self.persist(state, RenderScope::FULL)
            }
            Event::NewNote => {
                if state.current_folder().is_none() {
                    return Ok(RenderScope::empty());
                }
                let id = NoteId::new(self.ids.next_id());
                state.insert_note(id, self.clock.now_millis());
                self.persist(state, RenderScope::FULL)
            }
            Event::EditTitle(text) => match state.edit_title(&text, self.clock.now_millis()) {
                TitleTarget::Note => self.persist(state, RenderScope::NOTES),
                TitleTarget::Folder => self.persist(state, RenderScope::FOLDERS),
                TitleTarget::Nothing => Ok(RenderScope::empty()),
            },
            Event::EditContent(text) => {
                if !state.edit_content(&text, self.clock.now_millis()) {
                    return Ok(RenderScope::empty());
                }
                self.persist(state, RenderScope::empty())
            }
            Event::EditSearch(text) => {
                state.set_search_query(&text);
                self.persist(state, RenderScope::NOTES)
            }
            Event::ToggleMenu => {
                flags.toggle_menu();
                Ok(RenderScope::MENU)
            }
        }
    }

    fn persist(&self, state: &AppState, scope: RenderScope) -> Result<RenderScope, StoreError> {
        self.store.save(state)?;
        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fixtures::{SequentialIds, SteppingClock};
    use crate::host::PromptAnswer;
    use crate::storage::MemoryStore;
    use crate::ui::view;
    use assert_matches::assert_matches;

    struct Harness {
        store: StateStore<MemoryStore>,
        clock: SteppingClock,
        ids: SequentialIds,
        flags: ViewFlags,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: StateStore::new(MemoryStore::new(), "state"),
                clock: SteppingClock::new(1_000, 1_000),
                ids: SequentialIds::new("id"),
                flags: ViewFlags { menu_open: false },
            }
        }

        fn load(&self) -> AppState {
            self.store.load(&self.ids, &self.clock).expect("load state")
        }

        fn stored(&self) -> AppState {
            let raw = self.store.read_raw().expect("read").expect("present");
            serde_json::from_slice(&raw).expect("valid blob")
        }

        fn send(&mut self, state: &mut AppState, event: Event) -> RenderScope {
            self.answer(state, event, PromptAnswer::Confirmed)
        }

        fn answer(
            &mut self,
            state: &mut AppState,
            event: Event,
            mut answer: PromptAnswer,
        ) -> RenderScope {
            let dispatcher = ActionDispatcher::new(&self.store, &self.clock, &self.ids);
            dispatcher
                .dispatch(state, &mut self.flags, event, &mut answer)
                .expect("dispatch")
        }
    }

    #[test]
    fn work_plan_draft_survives_reload() {
        let mut h = Harness::new();
        let mut state = h.load();

        let scope = h.answer(&mut state, Event::NewFolder, PromptAnswer::Text("Work".into()));
        assert_eq!(scope, RenderScope::FULL);
        assert_eq!(h.send(&mut state, Event::NewNote), RenderScope::FULL);
        assert_eq!(
            h.send(&mut state, Event::EditTitle("Plan".into())),
            RenderScope::NOTES
        );
        assert_eq!(
            h.send(&mut state, Event::EditContent("Draft v1".into())),
            RenderScope::empty()
        );

        let reloaded = h.load();
        assert_eq!(reloaded, state);
        let work_id = reloaded.folder_id_by_name("Work").expect("work folder");
        let work = &reloaded.folders[&work_id];
        assert_eq!(work.notes.len(), 1);
        let plan = work.notes.values().next().expect("plan");
        assert_eq!(plan.title, "Plan");
        assert_eq!(plan.content, "Draft v1");
    }

    #[test]
    fn new_note_lands_in_selected_folder_with_creation_time() {
        let mut h = Harness::new();
        let mut state = h.load();
        let created_at = h.clock.peek();
        h.send(&mut state, Event::NewNote);

        let note = state.current_note().expect("new note selected");
        assert_eq!(note.title, "New note");
        assert_eq!(note.content, "");
        assert_eq!(note.updated_at, created_at);
        assert_eq!(state.current_folder().map(|f| f.notes.len()), Some(2));
        assert_eq!(h.stored(), state);
    }

    #[test]
    fn new_note_without_folder_is_a_no_op() {
        let mut h = Harness::new();
        let mut state = h.load();
        state.selected_folder_id = None;
        let before = h.stored();
        assert_eq!(h.send(&mut state, Event::NewNote), RenderScope::empty());
        assert_eq!(h.stored(), before);
    }

    #[test]
    fn edits_refresh_timestamp_and_persist() {
        let mut h = Harness::new();
        let mut state = h.load();
        let seeded_at = state.current_note().map(|n| n.updated_at).expect("note");

        let title_at = h.clock.peek();
        h.send(&mut state, Event::EditTitle("Hello".into()));
        assert_eq!(state.current_note().map(|n| n.updated_at), Some(title_at));
        assert!(title_at > seeded_at);
        assert_eq!(h.stored(), state);

        let content_at = h.clock.peek();
        h.send(&mut state, Event::EditContent("Body".into()));
        assert_eq!(state.current_note().map(|n| n.updated_at), Some(content_at));
        assert_eq!(h.stored(), state);
    }

    #[test]
    fn title_edit_without_note_renames_folder() {
        let mut h = Harness::new();
        let mut state = h.load();
        state.selected_note_id = None;
        assert_eq!(
            h.send(&mut state, Event::EditTitle("Personal".into())),
            RenderScope::FOLDERS
        );
        assert_eq!(view::render_folders(&state)[0].label, "Personal");

        state.selected_folder_id = None;
        assert_eq!(
            h.send(&mut state, Event::EditTitle("ignored".into())),
            RenderScope::empty()
        );
        assert_eq!(h.stored().folders.values().next().map(|f| f.name.clone()), Some("Personal".into()));
    }

    #[test]
    fn cancelled_deletes_change_nothing() {
        let mut h = Harness::new();
        let mut state = h.load();
        let folder_id = state.selected_folder_id.clone().expect("folder");
        let note_id = state.selected_note_id.clone().expect("note");
        let before = state.clone();

        for event in [Event::DeleteFolder(folder_id), Event::DeleteNote(note_id)] {
            let scope = h.answer(&mut state, event, PromptAnswer::Declined);
            assert_eq!(scope, RenderScope::empty());
        }
        assert_eq!(state, before);
        assert_eq!(h.stored(), before);
    }

    #[test]
    fn deleting_folder_removes_only_it_and_falls_back() {
        let mut h = Harness::new();
        let mut state = h.load();
        let inbox = state.selected_folder_id.clone().expect("inbox");
        h.answer(&mut state, Event::NewFolder, PromptAnswer::Text("Work".into()));
        h.send(&mut state, Event::NewNote);
        let work = state.selected_folder_id.clone().expect("work");

        assert_eq!(
            h.send(&mut state, Event::DeleteFolder(work.clone())),
            RenderScope::FULL
        );
        assert!(!state.folders.contains_key(&work));
        assert_eq!(state.folders.len(), 1);
        assert_eq!(state.selected_folder_id, Some(inbox.clone()));
        assert_eq!(state.selected_note_id, None);
        assert_eq!(state.folders[&inbox].notes.len(), 1);

        h.send(&mut state, Event::DeleteFolder(inbox));
        assert!(state.folders.is_empty());
        assert_eq!(state.selected_folder_id, None);
        assert_eq!(view::render(&state), view::View::default());
        assert_eq!(h.stored(), state);
    }

    #[test]
    fn deleting_only_note_empties_region() {
        let mut h = Harness::new();
        let mut state = h.load();
        let note = state.selected_note_id.clone().expect("welcome");
        assert_eq!(
            h.send(&mut state, Event::DeleteNote(note)),
            RenderScope::FULL
        );
        assert_eq!(state.selected_note_id, None);
        assert!(view::render_notes(&state).rows.is_empty());
        assert_eq!(h.stored().selected_note_id, None);
    }

    #[test]
    fn empty_or_cancelled_folder_prompt_aborts() {
        let mut h = Harness::new();
        let mut state = h.load();
        let before = state.clone();
        for answer in [PromptAnswer::Text(String::new()), PromptAnswer::Cancelled] {
            assert_eq!(
                h.answer(&mut state, Event::NewFolder, answer),
                RenderScope::empty()
            );
        }
        assert_eq!(state, before);
    }

    #[test]
    fn selecting_folder_clears_note_and_unknown_ids_are_ignored() {
        let mut h = Harness::new();
        let mut state = h.load();
        let inbox = state.selected_folder_id.clone().expect("inbox");
        assert_eq!(
            h.send(&mut state, Event::SelectFolder(FolderId::new("nope"))),
            RenderScope::empty()
        );
        assert_eq!(
            h.send(&mut state, Event::SelectNote(NoteId::new("nope"))),
            RenderScope::empty()
        );
        assert!(state.selected_note_id.is_some());

        h.send(&mut state, Event::SelectFolder(inbox));
        assert_eq!(state.selected_note_id, None);
        assert_eq!(h.stored().selected_note_id, None);
    }

    #[test]
    fn search_updates_query_and_note_list_only() {
        let mut h = Harness::new();
        let mut state = h.load();
        assert_eq!(
            h.send(&mut state, Event::EditSearch(" WEL".into())),
            RenderScope::NOTES
        );
        assert_eq!(state.search_query.as_deref(), Some(" WEL"));
        assert_eq!(view::render_notes(&state).rows.len(), 1);
        assert_eq!(h.stored().search_query.as_deref(), Some(" WEL"));
    }

    #[test]
    fn menu_toggle_is_ui_only() {
        let mut h = Harness::new();
        let mut state = h.load();
        let before = h.stored();
        assert_eq!(h.send(&mut state, Event::ToggleMenu), RenderScope::MENU);
        assert!(h.flags.menu_open);
        h.send(&mut state, Event::ToggleMenu);
        assert!(!h.flags.menu_open);
        assert_eq!(h.stored(), before);
    }

    #[test]
    fn persistence_failure_is_reported_after_mutation() {
        let mut h = Harness::new();
        let mut state = h.load();
        h.store.backend().set_read_only(true);
        let dispatcher = ActionDispatcher::new(&h.store, &h.clock, &h.ids);
        let err = dispatcher
            .dispatch(
                &mut state,
                &mut h.flags,
                Event::EditContent("unsaved".into()),
                &mut PromptAnswer::Cancelled,
            )
            .unwrap_err();
        assert_matches!(err, StoreError::PersistenceFailure { .. });
        assert_eq!(state.current_note().map(|n| n.content.as_str()), Some("unsaved"));
    }

    #[test]
    fn dialogs_describe_the_pending_action() {
        let h = Harness::new();
        let state = h.load();
        let folder = state.selected_folder_id.clone().expect("folder");
        let note = state.selected_note_id.clone().expect("note");
        assert_eq!(
            Event::DeleteFolder(folder).dialog(&state),
            Some(Dialog::Confirm(
                "Delete folder \"Inbox\"? All notes inside will be lost.".into()
            ))
        );
        assert_eq!(
            Event::DeleteNote(note).dialog(&state),
            Some(Dialog::Confirm("Delete note \"Welcome\"?".into()))
        );
        assert_eq!(
            Event::NewFolder.dialog(&state),
            Some(Dialog::Prompt("Folder name"))
        );
        assert_eq!(Event::NewNote.dialog(&state), None);
    }
}
