use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::search::NoteFilter;

pub const UNTITLED: &str = "Untitled";
pub const NEW_NOTE_TITLE: &str = "New note";
pub const SEED_FOLDER_NAME: &str = "Inbox";
pub const SEED_NOTE_TITLE: &str = "Welcome";
pub const SEED_NOTE_CONTENT: &str = "Your first note";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

impl FolderId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A note's identity is its key in [`Folder::notes`]; the value carries no id.
/// Older blobs that stored an `id` next to the title still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub updated_at: i64,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>, updated_at: i64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            updated_at,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notes: IndexMap<NoteId, Note>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: IndexMap::new(),
        }
    }
}

/// What a title edit ended up changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleTarget {
    Note,
    Folder,
    Nothing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub folders: IndexMap<FolderId, Folder>,
    #[serde(default)]
    pub selected_folder_id: Option<FolderId>,
    #[serde(default)]
    pub selected_note_id: Option<NoteId>,
    #[serde(default)]
    pub search_query: Option<String>,
}

impl AppState {
    /// First-run state: an "Inbox" holding a "Welcome" note, both selected.
    pub fn seeded(folder_id: FolderId, note_id: NoteId, now: i64) -> Self {
        let mut inbox = Folder::new(SEED_FOLDER_NAME);
        inbox.notes.insert(
            note_id.clone(),
            Note::new(SEED_NOTE_TITLE, SEED_NOTE_CONTENT, now),
        );
        let mut folders = IndexMap::new();
        folders.insert(folder_id.clone(), inbox);
        Self {
            folders,
            selected_folder_id: Some(folder_id),
            selected_note_id: Some(note_id),
            search_query: None,
        }
    }

    pub fn current_folder(&self) -> Option<&Folder> {
        self.selected_folder_id
            .as_ref()
            .and_then(|id| self.folders.get(id))
    }

    fn current_folder_mut(&mut self) -> Option<&mut Folder> {
        let id = self.selected_folder_id.as_ref()?;
        self.folders.get_mut(id)
    }

    pub fn current_note(&self) -> Option<&Note> {
        let folder = self.current_folder()?;
        self.selected_note_id
            .as_ref()
            .and_then(|id| folder.notes.get(id))
    }

    fn current_note_mut(&mut self) -> Option<&mut Note> {
        let note_id = self.selected_note_id.clone()?;
        self.current_folder_mut()?.notes.get_mut(&note_id)
    }

    pub fn filter(&self) -> NoteFilter {
        NoteFilter::parse(self.search_query.as_deref())
    }

    /// Notes of the current folder, most recently updated first, narrowed by
    /// the search query. Equal timestamps keep map order.
    pub fn visible_notes(&self) -> Vec<(&NoteId, &Note)> {
        let Some(folder) = self.current_folder() else {
            return Vec::new();
        };
        let filter = self.filter();
        let mut notes: Vec<_> = folder.notes.iter().collect();
        notes.sort_by(|(_, a), (_, b)| b.updated_at.cmp(&a.updated_at));
        notes.retain(|(_, note)| filter.matches(&note.title));
        notes
    }

    pub fn folder_id_by_name(&self, name: &str) -> Option<FolderId> {
        self.folders
            .iter()
            .find(|(_, folder)| folder.name == name)
            .map(|(id, _)| id.clone())
    }

    pub fn select_folder(&mut self, id: &FolderId) -> bool {
        if !self.folders.contains_key(id) {
            return false;
        }
        self.selected_folder_id = Some(id.clone());
        self.selected_note_id = None;
        true
    }

    /// Removes a folder with all of its notes. Selection moves to the first
    /// remaining folder only when the removed folder was the selected one.
    pub fn remove_folder(&mut self, id: &FolderId) -> Option<Folder> {
        let removed = self.folders.shift_remove(id)?;
        if self.selected_folder_id.as_ref() == Some(id) {
            self.selected_folder_id = self.folders.keys().next().cloned();
        }
        self.selected_note_id = None;
        Some(removed)
    }

    pub fn insert_folder(&mut self, id: FolderId, name: impl Into<String>) {
        self.folders.insert(id.clone(), Folder::new(name));
        self.selected_folder_id = Some(id);
        self.selected_note_id = None;
    }

    pub fn select_note(&mut self, id: &NoteId) -> bool {
        let exists = self
            .current_folder()
            .map(|folder| folder.notes.contains_key(id))
            .unwrap_or(false);
        if exists {
            self.selected_note_id = Some(id.clone());
        }
        exists
    }

    /// Removes a note from the current folder. When it was selected, the
    /// first remaining note of that folder (if any) becomes selected.
    pub fn remove_note(&mut self, id: &NoteId) -> Option<Note> {
        let folder = self.current_folder_mut()?;
        let removed = folder.notes.shift_remove(id)?;
        let fallback = folder.notes.keys().next().cloned();
        if self.selected_note_id.as_ref() == Some(id) {
            self.selected_note_id = fallback;
        }
        Some(removed)
    }

    pub fn insert_note(&mut self, id: NoteId, now: i64) -> bool {
        let Some(folder) = self.current_folder_mut() else {
            return false;
        };
        folder
            .notes
            .insert(id.clone(), Note::new(NEW_NOTE_TITLE, "", now));
        self.selected_note_id = Some(id);
        true
    }

    pub fn edit_title(&mut self, text: &str, now: i64) -> TitleTarget {
        if let Some(note) = self.current_note_mut() {
            note.title = text.to_owned();
            note.updated_at = now;
            return TitleTarget::Note;
        }
        if let Some(folder) = self.current_folder_mut() {
            folder.name = text.to_owned();
            return TitleTarget::Folder;
        }
        TitleTarget::Nothing
    }

    pub fn edit_content(&mut self, text: &str, now: i64) -> bool {
        match self.current_note_mut() {
            Some(note) => {
                note.content = text.to_owned();
                note.updated_at = now;
                true
            }
            None => false,
        }
    }

    pub fn set_search_query(&mut self, raw: &str) {
        self.search_query = Some(raw.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppState {
        let mut state = AppState::seeded(FolderId::new("inbox"), NoteId::new("welcome"), 100);
        state.insert_folder(FolderId::new("work"), "Work");
        state.insert_note(NoteId::new("plan"), 300);
        state.insert_note(NoteId::new("budget"), 200);
        state.insert_note(NoteId::new("retro"), 300);
        state
    }

    #[test]
    fn seeded_state_has_inbox_and_welcome_selected() {
        let state = AppState::seeded(FolderId::new("f"), NoteId::new("n"), 42);
        assert_eq!(state.folders.len(), 1);
        let folder = state.current_folder().expect("inbox selected");
        assert_eq!(folder.name, "Inbox");
        let note = state.current_note().expect("welcome selected");
        assert_eq!(note.title, "Welcome");
        assert_eq!(note.content, "Your first note");
        assert_eq!(note.updated_at, 42);
    }

    #[test]
    fn dangling_selection_is_treated_as_absent() {
        let mut state = sample();
        state.selected_folder_id = Some(FolderId::new("gone"));
        assert!(state.current_folder().is_none());
        assert!(state.current_note().is_none());
        assert!(state.visible_notes().is_empty());

        let mut state = sample();
        state.selected_note_id = Some(NoteId::new("gone"));
        assert!(state.current_folder().is_some());
        assert!(state.current_note().is_none());
    }

    #[test]
    fn note_from_another_folder_is_not_current() {
        let mut state = sample();
        state.selected_note_id = Some(NoteId::new("welcome"));
        assert!(state.current_note().is_none());
        assert!(!state.select_note(&NoteId::new("welcome")));
    }

    #[test]
    fn visible_notes_sort_newest_first_with_stable_ties() {
        let state = sample();
        let ids: Vec<_> = state
            .visible_notes()
            .into_iter()
            .map(|(id, _)| id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["plan", "retro", "budget"]);
    }

    #[test]
    fn search_only_narrows_titles_of_current_folder() {
        let mut state = sample();
        state.set_search_query("  PL ");
        let titles: Vec<_> = state
            .visible_notes()
            .into_iter()
            .map(|(id, _)| id.as_str().to_string())
            .collect();
        assert!(titles.is_empty(), "all work notes are titled 'New note'");

        state.edit_title("Plan", 400);
        let titles: Vec<_> = state
            .visible_notes()
            .into_iter()
            .map(|(_, note)| note.title.clone())
            .collect();
        assert_eq!(titles, vec!["Plan"]);
        assert_eq!(state.folders.len(), 2);
    }

    #[test]
    fn remove_selected_folder_falls_back_to_first_remaining() {
        let mut state = sample();
        let removed = state.remove_folder(&FolderId::new("work")).expect("removed");
        assert_eq!(removed.notes.len(), 3);
        assert_eq!(state.selected_folder_id, Some(FolderId::new("inbox")));
        assert_eq!(state.selected_note_id, None);

        assert!(state.remove_folder(&FolderId::new("inbox")).is_some());
        assert_eq!(state.selected_folder_id, None);
        assert!(state.folders.is_empty());
    }

    #[test]
    fn remove_unselected_folder_keeps_folder_selection() {
        let mut state = sample();
        state.remove_folder(&FolderId::new("inbox"));
        assert_eq!(state.selected_folder_id, Some(FolderId::new("work")));
        assert_eq!(state.selected_note_id, None);
        assert_eq!(state.folders.len(), 1);
    }

    #[test]
    fn remove_selected_note_selects_first_remaining() {
        let mut state = sample();
        assert_eq!(state.selected_note_id, Some(NoteId::new("retro")));
        state.remove_note(&NoteId::new("retro"));
        assert_eq!(state.selected_note_id, Some(NoteId::new("plan")));

        state.select_note(&NoteId::new("budget"));
        state.remove_note(&NoteId::new("plan"));
        assert_eq!(state.selected_note_id, Some(NoteId::new("budget")));
        state.remove_note(&NoteId::new("budget"));
        assert_eq!(state.selected_note_id, None);
        assert!(state.current_folder().expect("work").notes.is_empty());
    }

    #[test]
    fn title_edit_targets_note_then_folder_then_nothing() {
        let mut state = sample();
        assert_eq!(state.edit_title("Retro", 900), TitleTarget::Note);
        assert_eq!(state.current_note().map(|n| n.updated_at), Some(900));

        state.selected_note_id = None;
        assert_eq!(state.edit_title("Job", 901), TitleTarget::Folder);
        assert_eq!(state.current_folder().map(|f| f.name.as_str()), Some("Job"));

        state.selected_folder_id = None;
        assert_eq!(state.edit_title("ignored", 902), TitleTarget::Nothing);
    }

    #[test]
    fn content_edit_requires_a_note() {
        let mut state = sample();
        assert!(state.edit_content("Draft v1", 1_000));
        assert_eq!(
            state.current_note().map(|n| (n.content.as_str(), n.updated_at)),
            Some(("Draft v1", 1_000))
        );
        state.selected_note_id = None;
        assert!(!state.edit_content("lost", 1_001));
    }

    #[test]
    fn legacy_blob_with_note_ids_deserializes() -> anyhow::Result<()> {
        let raw = r#"{
            "folders": {
                "f1": {"name": "Inbox", "notes": {
                    "n1": {"id": "n1", "title": "Welcome", "content": "Your first note", "updatedAt": 7}
                }}
            },
            "selectedFolderId": "f1",
            "selectedNoteId": "n1"
        }"#;
        let state: AppState = serde_json::from_str(raw)?;
        assert_eq!(state.search_query, None);
        assert_eq!(state.current_note().map(|n| n.title.as_str()), Some("Welcome"));
        Ok(())
    }
}
