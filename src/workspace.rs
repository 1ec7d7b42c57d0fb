use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::blocks::BlockEditor;
use crate::error::Result;
use crate::files::FileLibrary;
use crate::notes::{Category, Note, NoteBook};
use crate::projects::ProjectStore;
use crate::settings::AppSettings;
use crate::storage::{self, KeyValueStore, StorageError, CATEGORIES_KEY, NOTES_KEY, SETTINGS_KEY};
use crate::todos::TodoStore;

/// Entity totals reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkspaceCounts {
    pub projects: usize,
    pub todos: usize,
    pub notes: usize,
    pub categories: usize,
    pub files: usize,
    pub blocks: usize,
}

// Settings, notes and categories are persisted in full after every change.
// Projects, todos, files and blocks live for the session only.
pub struct Workspace {
    store: Arc<dyn KeyValueStore>,
    settings: AppSettings,
    notes: NoteBook,
    pub projects: ProjectStore,
    pub todos: TodoStore,
    pub files: FileLibrary,
    pub blocks: BlockEditor,
}

impl Workspace {
    /// Load persisted settings, notes and categories from `store`.
    ///
    /// Missing keys fall back to defaults. Unreadable or unsupported blobs are
    /// returned as errors rather than being replaced.
    pub fn open(store: Arc<dyn KeyValueStore>, demo_data: bool) -> std::result::Result<Self, StorageError> {
        let settings: AppSettings = storage::load(store.as_ref(), SETTINGS_KEY)?.unwrap_or_default();
        let notes: Vec<Note> = storage::load(store.as_ref(), NOTES_KEY)?.unwrap_or_default();
        let categories: Vec<Category> =
            storage::load(store.as_ref(), CATEGORIES_KEY)?.unwrap_or_default();

        let notes = NoteBook::from_parts(notes, categories);
        tracing::info!(
            notes = notes.notes().len(),
            categories = notes.categories().len(),
            demo_data,
            "workspace loaded"
        );

        let (projects, todos, files) = if demo_data {
            (
                ProjectStore::with_demo_data(),
                TodoStore::with_demo_data(),
                FileLibrary::with_demo_data(),
            )
        } else {
            (ProjectStore::new(), TodoStore::new(), FileLibrary::new())
        };

        Ok(Self {
            store,
            settings,
            notes,
            projects,
            todos,
            files,
            blocks: BlockEditor::new(),
        })
    }

    pub fn counts(&self) -> WorkspaceCounts {
        WorkspaceCounts {
            projects: self.projects.list().len(),
            todos: self.todos.list().len(),
            notes: self.notes.notes().len(),
            categories: self.notes.categories().len(),
            files: self.files.list().len(),
            blocks: self.blocks.list().len(),
        }
    }

    // --- Settings ---

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Persist `settings`, then adopt them. A failed write leaves the current settings in place.
    pub fn replace_settings(&mut self, settings: AppSettings) -> Result<&AppSettings> {
        storage::save(self.store.as_ref(), SETTINGS_KEY, &settings)?;
        self.settings = settings;
        Ok(&self.settings)
    }

    /// Change one setting and persist the whole object.
    pub fn set_setting(&mut self, key: &str, value: Value) -> Result<&AppSettings> {
        let mut next = self.settings.clone();
        next.set_field(key, value)?;
        self.replace_settings(next)
    }

    // --- Notes & categories ---

    pub fn notes(&self) -> &NoteBook {
        &self.notes
    }

    /// Run a mutation against a copy of the notebook and keep it only once
    /// both collections are persisted.
    pub fn edit_notes<R>(&mut self, edit: impl FnOnce(&mut NoteBook) -> Result<R>) -> Result<R> {
        let mut next = self.notes.clone();
        let result = edit(&mut next)?;
        self.save_notes(&next)?;
        self.notes = next;
        Ok(result)
    }

    fn save_notes(&self, book: &NoteBook) -> std::result::Result<(), StorageError> {
        storage::save(self.store.as_ref(), NOTES_KEY, &book.notes())?;
        storage::save(self.store.as_ref(), CATEGORIES_KEY, &book.categories())
    }
}
