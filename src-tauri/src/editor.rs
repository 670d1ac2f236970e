use serde::Serialize;

use crate::error::{UpdateError, UpdateResult};
use crate::store::NoteStore;
use crate::types::{Note, NoteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum EditorMode {
    Create,
    Edit { id: NoteId },
}

/// Result of a submit that actually ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    /// Blank input; nothing happened.
    Ignored,
    Added(Note),
    Updated(Note),
}

/// The single text field at the top of the popover.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorForm {
    mode: EditorMode,
    text: String,
}

impl Default for EditorForm {
    fn default() -> Self {
        Self {
            mode: EditorMode::Create,
            text: String::new(),
        }
    }
}

impl EditorForm {
    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            EditorMode::Create => "Add Update",
            EditorMode::Edit { .. } => "Update",
        }
    }

    /// Load `note` into the field and switch to edit mode.
    pub fn begin_edit(&mut self, note: &Note) {
        tracing::debug!(id = note.id, "Editing update");
        self.mode = EditorMode::Edit { id: note.id };
        self.text = note.content.clone();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add or update depending on the mode.
    ///
    /// Blank input leaves both the store and the form untouched. Otherwise
    /// the form is back in create mode with an empty field afterwards, even
    /// when the store call failed.
    pub fn submit(&mut self, store: &mut NoteStore) -> UpdateResult<Submitted> {
        if self.text.trim().is_empty() {
            tracing::info!("No content to add");
            return Ok(Submitted::Ignored);
        }

        let mode = self.mode;
        let text = std::mem::take(&mut self.text);
        self.reset();

        match mode {
            EditorMode::Create => store.add(&text).map(Submitted::Added),
            EditorMode::Edit { id } => {
                let index = store.position(id).ok_or(UpdateError::NoteNotFound(id))?;
                store.update(index, &text).map(Submitted::Updated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn store() -> NoteStore {
        NoteStore::new(Box::new(MemoryBackend::new()))
    }

    #[test]
    fn whitespace_submit_is_a_no_op() {
        let mut store = store();
        store.add("existing").unwrap();
        let mut form = EditorForm::default();
        form.set_text("   ");

        assert_eq!(form.submit(&mut store).unwrap(), Submitted::Ignored);
        assert_eq!(store.len(), 1);
        assert_eq!(form.text(), "   ");
    }

    #[test]
    fn create_mode_adds_and_resets() {
        let mut store = store();
        let mut form = EditorForm::default();
        form.set_text("Paired on the search redesign");

        let outcome = form.submit(&mut store).unwrap();
        assert!(matches!(outcome, Submitted::Added(ref n) if n.content == "Paired on the search redesign"));
        assert_eq!(form, EditorForm::default());
    }

    #[test]
    fn edit_mode_updates_by_id_even_after_reorder() {
        let mut store = store();
        let target = store.add("first").unwrap();
        let mut form = EditorForm::default();
        form.begin_edit(&target);
        assert_eq!(form.submit_label(), "Update");

        // a new note shifts the target to index 1
        store.add("second").unwrap();
        form.set_text("first, revised");

        let Submitted::Updated(note) = form.submit(&mut store).unwrap() else {
            panic!("expected update");
        };
        assert_eq!(note.id, target.id);
        assert_eq!(store.notes()[1].content, "first, revised");
        assert_eq!(store.notes()[0].content, "second");
        assert_eq!(form.mode(), EditorMode::Create);
        assert_eq!(form.submit_label(), "Add Update");
    }

    #[test]
    fn editing_a_deleted_note_fails_but_still_resets() {
        let mut store = store();
        let target = store.add("gone soon").unwrap();
        let mut form = EditorForm::default();
        form.begin_edit(&target);
        store.delete(0).unwrap();

        let err = form.submit(&mut store).unwrap_err();
        assert!(matches!(err, UpdateError::NoteNotFound(id) if id == target.id));
        assert!(store.is_empty());
        assert_eq!(form, EditorForm::default());
    }
}
