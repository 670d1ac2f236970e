use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::types::Note;

/// Durable home for the note list. Implementations replace the whole
/// collection on every save; a failed save must leave the previous list
/// intact.
pub trait NoteBackend: Send {
    /// Notes in persisted order (newest-first). Empty when nothing was saved.
    fn load(&self) -> Result<Vec<Note>>;

    fn save_all(&self, notes: &[Note]) -> Result<()>;
}

/// String key/value preferences, the shape the settings keys have always had.
pub trait SettingsBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write every entry or none of them.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<()>;
}

/// Process-local backend. Used when no on-disk store is configured and in
/// tests. Clones share the same data, so a test can keep a handle and inspect
/// what the store persisted.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    notes: Arc<Mutex<Vec<Note>>>,
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes: Arc::new(Mutex::new(notes)),
            values: Arc::default(),
        }
    }

    /// Snapshot of what was last saved.
    pub fn saved_notes(&self) -> Vec<Note> {
        self.notes.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl NoteBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<Note>> {
        let notes = self
            .notes
            .lock()
            .map_err(|e| anyhow::anyhow!("note buffer lock poisoned: {e}"))?;
        Ok(notes.clone())
    }

    fn save_all(&self, notes: &[Note]) -> Result<()> {
        let mut saved = self
            .notes
            .lock()
            .map_err(|e| anyhow::anyhow!("note buffer lock poisoned: {e}"))?;
        *saved = notes.to_vec();
        Ok(())
    }
}

impl SettingsBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|e| anyhow::anyhow!("settings lock poisoned: {e}"))?;
        Ok(values.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| anyhow::anyhow!("settings lock poisoned: {e}"))?;
        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}
