//! Pure projection of [`AppState`] into the three on-screen regions. Nothing
//! here looks at the terminal; identical state always yields an identical
//! [`View`].

use bitflags::bitflags;

use crate::app::state::{AppState, FolderId, NoteId};

bitflags! {
    /// Regions a handler asks to have rebuilt.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderScope: u8 {
        const FOLDERS = 0b0001;
        const NOTES = 0b0010;
        const EDITOR = 0b0100;
        const MENU = 0b1000;
        const FULL = Self::FOLDERS.bits() | Self::NOTES.bits() | Self::EDITOR.bits();
    }
}

/// Presentation flags that live outside the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewFlags {
    pub menu_open: bool,
}

impl ViewFlags {
    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRow {
    pub id: FolderId,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub id: NoteId,
    pub label: String,
    pub active: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteRegion {
    pub rows: Vec<NoteRow>,
    /// Raw search text echoed back into the search field.
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorRegion {
    pub title: Field,
    pub content: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    pub folders: Vec<FolderRow>,
    pub notes: NoteRegion,
    pub editor: EditorRegion,
}

impl View {
    /// Rebuilds only the regions named in `scope`.
    pub fn refresh(&mut self, state: &AppState, scope: RenderScope) {
        if scope.contains(RenderScope::FOLDERS) {
            self.folders = render_folders(state);
        }
        if scope.contains(RenderScope::NOTES) {
            self.notes = render_notes(state);
        }
        if scope.contains(RenderScope::EDITOR) {
            self.editor = render_editor(state);
        }
    }
}

pub fn render(state: &AppState) -> View {
    View {
        folders: render_folders(state),
        notes: render_notes(state),
        editor: render_editor(state),
    }
}

pub fn render_folders(state: &AppState) -> Vec<FolderRow> {
    state
        .folders
        .iter()
        .map(|(id, folder)| FolderRow {
            id: id.clone(),
            label: folder.name.clone(),
            active: state.selected_folder_id.as_ref() == Some(id),
        })
        .collect()
}

pub fn render_notes(state: &AppState) -> NoteRegion {
    let rows = state
        .visible_notes()
        .into_iter()
        .map(|(id, note)| NoteRow {
            id: id.clone(),
            label: note.display_title().to_string(),
            active: state.selected_note_id.as_ref() == Some(id),
            updated_at: note.updated_at,
        })
        .collect();
    NoteRegion {
        rows,
        query: state.search_query.clone().unwrap_or_default(),
    }
}

pub fn render_editor(state: &AppState) -> EditorRegion {
    if let Some(note) = state.current_note() {
        return EditorRegion {
            title: Field {
                value: note.title.clone(),
                enabled: true,
            },
            content: Field {
                value: note.content.clone(),
                enabled: true,
            },
        };
    }
    if let Some(folder) = state.current_folder() {
        return EditorRegion {
            title: Field {
                value: folder.name.clone(),
                enabled: true,
            },
            content: Field::default(),
        };
    }
    EditorRegion::default()
}
