use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::confirm::{self, ConfirmPrompt, Decision, PromptView};
use crate::editor::{EditorForm, EditorMode, Submitted};
use crate::error::{UpdateError, UpdateResult};
use crate::settings::{Settings, SettingsStore};
use crate::storage::{NoteBackend, SettingsBackend};
use crate::store::NoteStore;
use crate::types::{Note, NoteId};
use crate::view::ListView;

const DELETE_MESSAGE: &str =
    "Are you sure you want to delete this update? This action cannot be undone.";

/// Actions that wait behind a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    DeleteNote { id: NoteId },
}

/// Editor state as the web view needs it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    #[serde(flatten)]
    pub mode: EditorMode,
    pub text: String,
    pub submit_label: &'static str,
}

/// Everything the popover draws, returned after every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub list: ListView,
    pub editor: EditorView,
    pub confirm: Option<PromptView>,
}

/// The note-taking UI's logic: note list, editor, pending confirmation and
/// settings. Owned by the app state; nothing here is global.
pub struct Workspace {
    store: NoteStore,
    editor: EditorForm,
    settings: SettingsStore,
    pending: Option<ConfirmPrompt<PendingAction>>,
    prompts_shown: usize,
}

impl Workspace {
    pub fn new(notes: Box<dyn NoteBackend>, settings: Box<dyn SettingsBackend>) -> Self {
        Self {
            store: NoteStore::new(notes),
            editor: EditorForm::default(),
            settings: SettingsStore::new(settings),
            pending: None,
            prompts_shown: 0,
        }
    }

    /// Pull notes and settings from their backends.
    pub fn load(&mut self) -> UpdateResult<()> {
        self.store.load()?;
        self.settings.load()?;
        Ok(())
    }

    pub fn notes(&self) -> &[Note] {
        self.store.notes()
    }

    pub fn view(&self) -> ListView {
        ListView::render(self.store.notes())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            list: self.view(),
            editor: self.editor_view(),
            confirm: self.pending.as_ref().map(ConfirmPrompt::view),
        }
    }

    pub fn editor_view(&self) -> EditorView {
        EditorView {
            mode: self.editor.mode(),
            text: self.editor.text().to_string(),
            submit_label: self.editor.submit_label(),
        }
    }

    // ─── Notes ───────────────────────────────────────────────────────────────

    pub fn add(&mut self, content: &str) -> UpdateResult<Note> {
        self.store.add(content)
    }

    pub fn update_at(&mut self, index: usize, content: &str) -> UpdateResult<Note> {
        self.store.update(index, content)
    }

    pub fn delete_at(&mut self, index: usize) -> UpdateResult<Note> {
        let removed = self.store.delete(index)?;
        self.forget_edit_of(removed.id);
        Ok(removed)
    }

    pub fn replace_all(&mut self, notes: Vec<Note>) -> UpdateResult<()> {
        self.editor.reset();
        self.pending = None;
        self.store.replace_all(notes)
    }

    /// Submit the editor with `text` as its content.
    pub fn submit(&mut self, text: &str) -> UpdateResult<Submitted> {
        self.editor.set_text(text);
        self.editor.submit(&mut self.store)
    }

    pub fn begin_edit(&mut self, id: NoteId) -> UpdateResult<EditorView> {
        let index = self.store.position(id).ok_or(UpdateError::NoteNotFound(id))?;
        self.editor.begin_edit(&self.store.notes()[index]);
        Ok(self.editor_view())
    }

    pub fn cancel_edit(&mut self) {
        self.editor.reset();
    }

    // ─── Delete confirmation ─────────────────────────────────────────────────

    /// Show the delete prompt for `id`. A newer request replaces an
    /// unanswered one.
    pub fn request_delete(&mut self, id: NoteId) -> UpdateResult<PromptView> {
        let index = self.store.position(id).ok_or(UpdateError::NoteNotFound(id))?;
        let note = &self.store.notes()[index];
        tracing::debug!(id, index, "Asking to confirm delete");

        let prompt = ConfirmPrompt::new(
            DELETE_MESSAGE,
            confirm::preview(&note.content),
            PendingAction::DeleteNote { id },
        );
        let view = prompt.view();
        self.pending = Some(prompt);
        self.prompts_shown += 1;
        Ok(view)
    }

    pub fn pending(&self) -> Option<&ConfirmPrompt<PendingAction>> {
        self.pending.as_ref()
    }

    pub fn prompts_shown(&self) -> usize {
        self.prompts_shown
    }

    /// Answer the open prompt. Returns the deleted note when the action ran,
    /// `None` when the user backed out or nothing was pending.
    pub fn resolve_pending(&mut self, decision: Decision) -> UpdateResult<Option<Note>> {
        let Some(prompt) = self.pending.take() else {
            tracing::debug!("No prompt to resolve");
            return Ok(None);
        };

        prompt.resolve(
            decision,
            |action| -> UpdateResult<Option<Note>> {
                match action {
                    PendingAction::DeleteNote { id } => {
                        let index =
                            self.store.position(id).ok_or(UpdateError::NoteNotFound(id))?;
                        let removed = self.delete_at(index)?;
                        Ok(Some(removed))
                    }
                }
            },
            |_| {
                tracing::info!("Delete cancelled, update kept");
                Ok(None)
            },
        )
    }

    fn forget_edit_of(&mut self, id: NoteId) {
        if self.editor.mode() == (EditorMode::Edit { id }) {
            self.editor.reset();
        }
    }

    // ─── Settings ────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        self.settings.current()
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    pub fn save_settings(&mut self, settings: Settings) -> UpdateResult<()> {
        self.settings.save(settings)
    }

    pub fn last_auto_summary(&self) -> UpdateResult<Option<DateTime<Utc>>> {
        self.settings.last_auto_summary()
    }

    pub fn record_auto_summary(&mut self, at: DateTime<Utc>) -> UpdateResult<()> {
        self.settings.record_auto_summary(at)
    }
}
