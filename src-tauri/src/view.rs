use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::types::{Note, NoteId};

pub const EMPTY_TITLE: &str = "Ready to capture your week? 📝";
pub const EMPTY_MESSAGE: &str =
    "Start by adding your first update above. Every journey begins with a single step!";

/// What the web view draws for the update list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ListView {
    /// Placeholder shown instead of an empty container.
    Empty { title: String, message: String },
    Items { items: Vec<ListItem> },
}

/// One rendered update. `index` is the position at render time; the
/// Edit/Delete actions target `id` so a re-ordered list can't hit the wrong row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: NoteId,
    pub index: usize,
    pub date_label: String,
    pub content: String,
}

impl ListView {
    /// Render with dates in the machine's local zone.
    pub fn render(notes: &[Note]) -> Self {
        Self::render_in(notes, &Local)
    }

    pub fn render_in<Tz>(notes: &[Note], tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        if notes.is_empty() {
            return Self::Empty {
                title: EMPTY_TITLE.to_string(),
                message: EMPTY_MESSAGE.to_string(),
            };
        }

        let items = notes
            .iter()
            .enumerate()
            .map(|(index, note)| ListItem {
                id: note.id,
                index,
                // e.g. "Jul 7, 09:05 AM"
                date_label: note
                    .created_at
                    .with_timezone(tz)
                    .format("%b %-d, %I:%M %p")
                    .to_string(),
                content: note.content.clone(),
            })
            .collect();
        Self::Items { items }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty { .. } => 0,
            Self::Items { items } => items.len(),
        }
    }
}
