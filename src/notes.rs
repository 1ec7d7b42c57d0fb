// A note's category is None or an existing category. Deleting a category
// orphans its notes. Note counts are recomputed after every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::{double_option, new_id, Collection, Entity};
use crate::error::{AppError, Result};

// --- Data Types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Creation time.
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub category_id: Option<String>,
}

impl Entity for Note {
    const KIND: &'static str = "Note";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub note_count: usize,
    #[serde(default = "default_open")]
    pub is_open: bool,
}

fn default_open() -> bool {
    true
}

impl Entity for Category {
    const KIND: &'static str = "Category";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<String>>,
}

/// Which notes a list view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFilter {
    All,
    Uncategorized,
    Category(String),
}

impl NoteFilter {
    /// `None` means all notes; `"uncategorized"` selects notes without a category.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None | Some("") => NoteFilter::All,
            Some("uncategorized") => NoteFilter::Uncategorized,
            Some(id) => NoteFilter::Category(id.to_string()),
        }
    }

    fn matches(&self, note: &Note) -> bool {
        match self {
            NoteFilter::All => true,
            NoteFilter::Uncategorized => note.category_id.is_none(),
            NoteFilter::Category(id) => note.category_id.as_deref() == Some(id.as_str()),
        }
    }
}

fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("Note {} cannot be empty", field)));
    }
    Ok(())
}

fn category_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Category name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

// --- NoteBook ---

#[derive(Debug, Clone, Default)]
pub struct NoteBook {
    notes: Collection<Note>,
    categories: Collection<Category>,
}

impl NoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored collections. Dangling category references left by
    /// older data are orphaned and counts are recomputed.
    pub fn from_parts(notes: Vec<Note>, categories: Vec<Category>) -> Self {
        let mut book = Self {
            notes: Collection::from_vec(notes),
            categories: Collection::from_vec(categories),
        };
        let mut orphaned = 0;
        for note in book.notes.iter_mut() {
            let dangling = note
                .category_id
                .as_deref()
                .is_some_and(|id| !book.categories.contains(id));
            if dangling {
                note.category_id = None;
                orphaned += 1;
            }
        }
        if orphaned > 0 {
            tracing::warn!(orphaned, "stored notes referenced missing categories");
        }
        book.recount();
        book
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.as_slice()
    }

    pub fn categories(&self) -> &[Category] {
        self.categories.as_slice()
    }

    pub fn note(&self, id: &str) -> Result<&Note> {
        self.notes.get(id)
    }

    pub fn filtered(&self, filter: &NoteFilter) -> Vec<&Note> {
        self.notes.iter().filter(|note| filter.matches(note)).collect()
    }

    fn recount(&mut self) {
        let notes = &self.notes;
        for category in self.categories.iter_mut() {
            category.note_count = notes
                .iter()
                .filter(|note| note.category_id.as_deref() == Some(category.id.as_str()))
                .count();
        }
    }

    fn check_category(&self, category_id: Option<&str>) -> Result<()> {
        match category_id {
            Some(id) if !self.categories.contains(id) => Err(AppError::Validation(format!(
                "Category '{}' does not exist",
                id
            ))),
            _ => Ok(()),
        }
    }

    // --- Notes ---

    pub fn create_note(&mut self, new: NewNote) -> Result<&Note> {
        non_empty("title", &new.title)?;
        non_empty("content", &new.content)?;
        self.check_category(new.category_id.as_deref())?;

        let note = Note {
            id: new_id(),
            title: new.title,
            content: new.content,
            date: Utc::now(),
            category_id: new.category_id,
        };
        let id = note.id.clone();
        self.notes.push(note);
        self.recount();
        self.notes.get(&id)
    }

    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> Result<&Note> {
        if let Some(category_id) = &patch.category_id {
            self.check_category(category_id.as_deref())?;
        }
        self.notes.update(id, |note| {
            if let Some(title) = patch.title {
                note.title = title;
            }
            if let Some(content) = patch.content {
                note.content = content;
            }
            if let Some(category_id) = patch.category_id {
                note.category_id = category_id;
            }
        })?;
        self.recount();
        self.notes.get(id)
    }

    /// Drop a note onto a category, or onto "uncategorized" with `None`.
    pub fn move_note(&mut self, id: &str, category_id: Option<String>) -> Result<&Note> {
        self.update_note(
            id,
            NotePatch {
                category_id: Some(category_id),
                ..Default::default()
            },
        )
    }

    pub fn delete_note(&mut self, id: &str) -> Result<Note> {
        let note = self.notes.remove(id)?;
        self.recount();
        Ok(note)
    }

    pub fn reorder_notes(&mut self, from: usize, to: usize) -> Result<()> {
        self.notes.reorder(from, to)
    }

    // --- Categories ---

    pub fn create_category(&mut self, name: &str) -> Result<&Category> {
        let category = Category {
            id: new_id(),
            name: category_name(name)?,
            note_count: 0,
            is_open: true,
        };
        Ok(self.categories.push(category))
    }

    pub fn rename_category(&mut self, id: &str, name: &str) -> Result<&Category> {
        let name = category_name(name)?;
        self.categories.update(id, |category| category.name = name)
    }

    /// Flip the expand/collapse flag.
    pub fn toggle_category(&mut self, id: &str) -> Result<&Category> {
        self.categories
            .update(id, |category| category.is_open = !category.is_open)
    }

    /// Remove a category. Its notes stay and become uncategorized; returns
    /// the removed category and how many notes were orphaned.
    pub fn delete_category(&mut self, id: &str) -> Result<(Category, usize)> {
        let category = self.categories.remove(id)?;
        let mut orphaned = 0;
        for note in self.notes.iter_mut() {
            if note.category_id.as_deref() == Some(id) {
                note.category_id = None;
                orphaned += 1;
            }
        }
        self.recount();
        Ok((category, orphaned))
    }
}
