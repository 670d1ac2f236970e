use serde::{Deserialize, Serialize};

/// Characters of the note shown in a delete prompt before it is cut off.
pub const PREVIEW_CHARS: usize = 100;

/// How the user closed a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Decision {
    Confirm,
    Cancel,
    /// Click outside the modal. Treated exactly like `Cancel`.
    DismissOutside,
}

impl Decision {
    pub fn confirmed(self) -> bool {
        matches!(self, Self::Confirm)
    }
}

/// A yes/no gate around some pending action `A`.
///
/// Resolving consumes the prompt, so one of the two continuations runs
/// exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmPrompt<A> {
    pub message: String,
    pub preview: String,
    action: A,
}

impl<A> ConfirmPrompt<A> {
    pub fn new(message: impl Into<String>, preview: impl Into<String>, action: A) -> Self {
        Self {
            message: message.into(),
            preview: preview.into(),
            action,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn resolve<T>(
        self,
        decision: Decision,
        on_confirm: impl FnOnce(A) -> T,
        on_cancel: impl FnOnce(A) -> T,
    ) -> T {
        if decision.confirmed() {
            tracing::debug!("Prompt confirmed");
            on_confirm(self.action)
        } else {
            tracing::debug!(?decision, "Prompt cancelled");
            on_cancel(self.action)
        }
    }

    /// The part the web view needs to draw the modal.
    pub fn view(&self) -> PromptView {
        PromptView {
            message: self.message.clone(),
            preview: self.preview.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptView {
    pub message: String,
    pub preview: String,
}

/// First [`PREVIEW_CHARS`] characters, with "..." appended when cut.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
