use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Stable per-note identifier. Assigned at creation, never reused while the
/// process runs. Position in the list is display order only.
pub type NoteId = u64;

/// One weekly update.
///
/// Serialized as `{ id, content, createdAt, updatedAt? }`. `id` is optional on
/// input so records written by older builds (or the bare record shape) still
/// load; the store assigns fresh ids to those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: NoteId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    pub fn new(id: NoteId, content: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            content,
            created_at: now,
            updated_at: Some(now),
        }
    }
}

/// ISO-8601 with whatever sub-second precision the value carries, so a
/// timestamp survives a text round-trip unchanged.
pub fn to_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_iso8601(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_record_without_id_or_updated_at() {
        let note: Note =
            serde_json::from_str(r#"{"content":"shipped","createdAt":"2025-07-07T09:05:00.000Z"}"#)
                .unwrap();
        assert_eq!(note.id, 0);
        assert_eq!(note.content, "shipped");
        assert!(note.updated_at.is_none());
    }

    #[test]
    fn omits_missing_updated_at_on_the_wire() {
        let mut note = Note::new(3, "x".into(), Utc::now());
        note.updated_at = None;
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("updatedAt").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn iso_text_keeps_subsecond_precision() {
        let ts = parse_iso8601("2025-07-11T09:05:12.345678Z").unwrap();
        assert_eq!(parse_iso8601(&to_iso8601(&ts)).unwrap(), ts);
    }
}
