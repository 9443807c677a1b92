//! In-memory note store: the single source of truth for the active session.
//!
//! Only gateway-confirmed records enter the store. The editor's draft is
//! never visible here; other consumers always see the last value the remote
//! authority confirmed.

use std::collections::HashMap;

use uuid::Uuid;

use notarium_core::{Error, Note, Result};

/// In-memory collection of persisted notes.
#[derive(Debug, Default)]
pub struct NoteStore {
    notes: HashMap<Uuid, Note>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole cache with a fresh authority snapshot.
    pub fn replace_all(&mut self, notes: Vec<Note>) {
        self.notes = notes.into_iter().map(|n| (n.id, n)).collect();
    }

    /// Snapshot of all notes, most recently modified first.
    pub fn list(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.notes.values().cloned().collect();
        notes.sort_by(|a, b| b.updated_at_utc.cmp(&a.updated_at_utc));
        notes
    }

    pub fn get(&self, id: Uuid) -> Option<&Note> {
        self.notes.get(&id)
    }

    /// Insert or replace a confirmed record.
    pub fn upsert(&mut self, note: Note) -> Note {
        self.notes.insert(note.id, note.clone());
        note
    }

    /// Remove a note from the cache.
    pub fn remove(&mut self, id: Uuid) -> Result<Note> {
        self.notes.remove(&id).ok_or(Error::NoteNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
