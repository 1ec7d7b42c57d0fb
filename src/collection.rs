// Ordered, id-addressed collections shared by every entity store.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Anything kept in a [`Collection`].
pub trait Entity {
    /// Human-readable kind, used in "not found" errors.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Fresh identifier for a new entity.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Deserializer for patch fields that can be cleared: a missing field stays
/// `None`, an explicit `null` becomes `Some(None)`. Pair with `#[serde(default)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// An ordered list of entities. Order is meaningful (it is the display order)
/// and is preserved by every operation except [`Collection::reorder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Result<&T> {
        self.items
            .iter()
            .find(|item| item.id() == id)
            .ok_or_else(|| AppError::not_found(T::KIND, id))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut T> {
        self.items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| AppError::not_found(T::KIND, id))
    }

    /// Append at the end.
    pub fn push(&mut self, item: T) -> &T {
        self.items.push(item);
        &self.items[self.items.len() - 1]
    }

    /// Insert at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, item: T) -> &T {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        &self.items[index]
    }

    /// Apply `patch` to the entity in place. Fields the patch leaves alone keep their value.
    pub fn update<F>(&mut self, id: &str, patch: F) -> Result<&T>
    where
        F: FnOnce(&mut T),
    {
        let item = self.get_mut(id)?;
        patch(&mut *item);
        Ok(&*item)
    }

    pub fn remove(&mut self, id: &str) -> Result<T> {
        let index = self
            .position(id)
            .ok_or_else(|| AppError::not_found(T::KIND, id))?;
        Ok(self.items.remove(index))
    }

    /// Move the entity at `from` so that it ends up at `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(AppError::Validation(format!(
                "Cannot move {} from index {} to {}: collection has {} entries",
                T::KIND,
                from,
                to,
                len
            )));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }
}
