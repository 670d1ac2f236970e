use chrono::Utc;

use crate::error::{UpdateError, UpdateResult};
use crate::storage::NoteBackend;
use crate::types::{Note, NoteId};

/// Owns the in-memory note list and pushes the full list to its backend after
/// every mutation.
///
/// If the backend write fails the mutation is kept in memory and the call
/// returns [`UpdateError::Persistence`]; the next successful save makes it
/// durable.
pub struct NoteStore {
    backend: Box<dyn NoteBackend>,
    notes: Vec<Note>,
    next_id: NoteId,
}

impl NoteStore {
    pub fn new(backend: Box<dyn NoteBackend>) -> Self {
        Self {
            backend,
            notes: Vec::new(),
            next_id: 1,
        }
    }

    /// Replace the in-memory list with whatever the backend holds.
    pub fn load(&mut self) -> UpdateResult<&[Note]> {
        let notes = self.backend.load().map_err(UpdateError::Persistence)?;
        self.install(notes);
        tracing::debug!(count = self.notes.len(), "Loaded updates");
        Ok(&self.notes)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Current index of a stable id.
    pub fn position(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    /// Persist `notes` as the complete collection, then adopt it in memory.
    pub fn save_all(&mut self, notes: Vec<Note>) -> UpdateResult<()> {
        self.install(notes);
        self.persist()
    }

    /// Bridge-side full replace. Same as [`save_all`](Self::save_all) but
    /// named for the `saveUpdates` message.
    pub fn replace_all(&mut self, notes: Vec<Note>) -> UpdateResult<()> {
        self.save_all(notes)
    }

    /// Prepend a new note. Content is trimmed and must not be empty.
    pub fn add(&mut self, content: &str) -> UpdateResult<Note> {
        let content = content.trim();
        if content.is_empty() {
            return Err(UpdateError::EmptyContent);
        }
        let note = Note::new(self.take_id(), content.to_string(), Utc::now());
        self.notes.insert(0, note.clone());
        tracing::info!(id = note.id, "Added update");
        self.persist()?;
        Ok(note)
    }

    /// Replace the content at `index` and refresh `updated_at`. `created_at`
    /// is never touched and `updated_at` never moves backwards.
    pub fn update(&mut self, index: usize, content: &str) -> UpdateResult<Note> {
        let content = content.trim();
        if content.is_empty() {
            return Err(UpdateError::EmptyContent);
        }
        let len = self.notes.len();
        let note = self
            .notes
            .get_mut(index)
            .ok_or(UpdateError::IndexOutOfRange { index, len })?;

        let now = Utc::now();
        note.content = content.to_string();
        note.updated_at = Some(note.updated_at.map_or(now, |prev| prev.max(now)));
        let note = note.clone();
        tracing::info!(id = note.id, index, "Updated update");
        self.persist()?;
        Ok(note)
    }

    pub fn delete(&mut self, index: usize) -> UpdateResult<Note> {
        if index >= self.notes.len() {
            return Err(UpdateError::IndexOutOfRange {
                index,
                len: self.notes.len(),
            });
        }
        let removed = self.notes.remove(index);
        tracing::info!(id = removed.id, index, "Deleted update");
        self.persist()?;
        Ok(removed)
    }

    fn persist(&self) -> UpdateResult<()> {
        self.backend.save_all(&self.notes).map_err(|e| {
            tracing::warn!("Saving updates failed, keeping them in memory: {e:#}");
            UpdateError::Persistence(e)
        })
    }

    /// Adopt `notes`, giving an id to any record that lacks one or repeats one.
    /// Records whose content trims to nothing are dropped.
    fn install(&mut self, notes: Vec<Note>) {
        let mut notes: Vec<Note> = notes
            .into_iter()
            .filter_map(|mut note| {
                let trimmed = note.content.trim();
                if trimmed.is_empty() {
                    tracing::warn!(id = note.id, "Skipping update with empty content");
                    return None;
                }
                if trimmed.len() != note.content.len() {
                    note.content = trimmed.to_string();
                }
                Some(note)
            })
            .collect();
        let mut next = notes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        next = next.max(self.next_id);
        let mut seen = std::collections::HashSet::new();
        for note in &mut notes {
            if note.id == 0 || !seen.insert(note.id) {
                note.id = next;
                seen.insert(next);
                next += 1;
            }
        }
        self.notes = notes;
        self.next_id = next;
    }

    fn take_id(&mut self) -> NoteId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
