//! Shared note collection.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::Note;

/// Notes shared between concurrently running sources.
///
/// Every mutation addresses a note by id; positions shift as notes are
/// added and removed, so no caller holds on to an index.
#[derive(Debug, Clone, Default)]
pub struct NoteBook {
    notes: Arc<RwLock<Vec<Note>>>,
}

impl NoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_notes(notes: Vec<Note>) -> Self {
        Self {
            notes: Arc::new(RwLock::new(notes)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Note>> {
        self.notes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Note>> {
        self.notes.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of every note, in insertion order.
    pub fn snapshot(&self) -> Vec<Note> {
        self.read().clone()
    }

    pub fn get(&self, id: i64) -> Option<Note> {
        self.read().iter().find(|n| n.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn push(&self, note: Note) {
        self.write().push(note);
    }

    pub fn extend(&self, notes: impl IntoIterator<Item = Note>) {
        self.write().extend(notes);
    }

    /// Replace the whole collection, returning the previous notes.
    pub fn replace_all(&self, notes: Vec<Note>) -> Vec<Note> {
        std::mem::replace(&mut *self.write(), notes)
    }

    pub fn clear(&self) -> Vec<Note> {
        self.replace_all(Vec::new())
    }

    pub fn remove(&self, id: i64) -> Option<Note> {
        let mut notes = self.write();
        let pos = notes.iter().position(|n| n.id == id)?;
        Some(notes.remove(pos))
    }

    /// Apply `f` to the note with `id`. Returns `None` when it no longer exists.
    pub fn update<R>(&self, id: i64, f: impl FnOnce(&mut Note) -> R) -> Option<R> {
        self.write().iter_mut().find(|n| n.id == id).map(f)
    }

    pub fn source_keys(&self) -> HashSet<String> {
        self.read().iter().map(|n| n.source_key.clone()).collect()
    }
}
