use serde::{Deserialize, Serialize};

use crate::error::UpdateResult;
use crate::summary::SummaryRequest;
use crate::types::Note;
use crate::AppMutex;

/// Messages from the web view to the shell, tagged by `action`:
/// `{"action":"saveUpdates","updates":[...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BridgeRequest {
    GetUpdates,
    SaveUpdates { updates: Vec<Note> },
    GenerateSummary(SummaryRequest),
    CloseApp,
    OpenPopover,
    ClosePopover,
}

/// Messages from the shell back to the web view, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeEvent {
    LoadUpdates { updates: Vec<Note> },
    SummaryGenerated { summary: String },
}

/// Visibility controls the shell owns. Everything else about the window is
/// the shell's business.
pub trait ShellControl: Send + Sync {
    fn close_app(&self);
    fn open_popover(&self);
    fn close_popover(&self);
}

/// For running without a window (tests, CLI harnesses).
#[derive(Debug, Default)]
pub struct HeadlessShell;

impl ShellControl for HeadlessShell {
    fn close_app(&self) {
        tracing::info!("Close requested with no window attached");
    }

    fn open_popover(&self) {
        tracing::debug!("Open popover ignored, headless");
    }

    fn close_popover(&self) {
        tracing::debug!("Close popover ignored, headless");
    }
}

/// Handle one bridge message. `Some(event)` is the reply to send back.
pub async fn dispatch(
    state: &AppMutex,
    shell: &dyn ShellControl,
    request: BridgeRequest,
) -> UpdateResult<Option<BridgeEvent>> {
    match request {
        BridgeRequest::GetUpdates => {
            let s = state.lock().await;
            Ok(Some(BridgeEvent::LoadUpdates {
                updates: s.workspace.notes().to_vec(),
            }))
        }
        BridgeRequest::SaveUpdates { updates } => {
            tracing::debug!(count = updates.len(), "saveUpdates");
            state.lock().await.workspace.replace_all(updates)?;
            Ok(None)
        }
        BridgeRequest::GenerateSummary(request) => {
            let generator = state.lock().await.generator.clone();
            let summary = generator.submit(request).await?;
            Ok(Some(BridgeEvent::SummaryGenerated { summary }))
        }
        BridgeRequest::CloseApp => {
            shell.close_app();
            Ok(None)
        }
        BridgeRequest::OpenPopover => {
            shell.open_popover();
            Ok(None)
        }
        BridgeRequest::ClosePopover => {
            shell.close_popover();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpdateError;
    use crate::storage::MemoryBackend;
    use crate::summary::testing::CountingBackend;
    use crate::summary::SummaryGenerator;
    use crate::AppState;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingShell {
        calls: Mutex<Vec<&'static str>>,
    }

    impl ShellControl for RecordingShell {
        fn close_app(&self) {
            self.calls.lock().unwrap().push("closeApp");
        }
        fn open_popover(&self) {
            self.calls.lock().unwrap().push("openPopover");
        }
        fn close_popover(&self) {
            self.calls.lock().unwrap().push("closePopover");
        }
    }

    fn state() -> (AppMutex, MemoryBackend, Arc<CountingBackend>) {
        let backend = MemoryBackend::new();
        let counting = Arc::new(CountingBackend::default());
        let state = AppState::new(
            Box::new(backend.clone()),
            Box::new(backend.clone()),
            SummaryGenerator::new(counting.clone()),
        )
        .unwrap();
        (AppMutex::new(state), backend, counting)
    }

    #[test]
    fn parses_wire_messages() {
        let save: BridgeRequest = serde_json::from_str(
            r#"{"action":"saveUpdates","updates":[{"content":"hi","createdAt":"2025-07-07T09:00:00Z"}]}"#,
        )
        .unwrap();
        assert!(matches!(save, BridgeRequest::SaveUpdates { ref updates } if updates.len() == 1));

        let gen: BridgeRequest = serde_json::from_str(
            r#"{"action":"generateSummary","apiKey":"sk","prompt":"p","updates":"a\n\nb"}"#,
        )
        .unwrap();
        assert!(matches!(gen, BridgeRequest::GenerateSummary(ref r) if r.updates == "a\n\nb"));

        let close: BridgeRequest = serde_json::from_str(r#"{"action":"closePopover"}"#).unwrap();
        assert_eq!(close, BridgeRequest::ClosePopover);
    }

    #[test]
    fn events_are_tagged_by_type() {
        let json = serde_json::to_value(BridgeEvent::SummaryGenerated {
            summary: "ok".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "type": "summaryGenerated", "summary": "ok" }));
    }

    #[tokio::test]
    async fn save_then_get_returns_same_list() {
        let (state, backend, _) = state();
        let shell = HeadlessShell;
        let updates: Vec<Note> = serde_json::from_str(
            r#"[{"content":"newer","createdAt":"2025-07-08T09:00:00Z"},
                {"content":"older","createdAt":"2025-07-07T09:00:00Z","updatedAt":"2025-07-07T10:00:00Z"}]"#,
        )
        .unwrap();

        let reply = dispatch(&state, &shell, BridgeRequest::SaveUpdates { updates })
            .await
            .unwrap();
        assert!(reply.is_none());
        assert_eq!(backend.saved_notes().len(), 2);

        let Some(BridgeEvent::LoadUpdates { updates }) =
            dispatch(&state, &shell, BridgeRequest::GetUpdates).await.unwrap()
        else {
            panic!("expected loadUpdates");
        };
        let contents: Vec<_> = updates.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, ["newer", "older"]);
        assert!(updates.iter().all(|n| n.id != 0));
    }

    #[tokio::test]
    async fn save_skips_blank_records() {
        let (state, backend, _) = state();
        let updates: Vec<Note> = serde_json::from_str(
            r#"[{"content":"   ","createdAt":"2025-07-08T09:00:00Z"},
                {"content":"  kept  ","createdAt":"2025-07-07T09:00:00Z"},
                {"content":"","createdAt":"2025-07-06T09:00:00Z"}]"#,
        )
        .unwrap();

        dispatch(&state, &HeadlessShell, BridgeRequest::SaveUpdates { updates })
            .await
            .unwrap();

        let saved: Vec<_> = backend.saved_notes().into_iter().map(|n| n.content).collect();
        assert_eq!(saved, ["kept"]);
        assert_eq!(state.lock().await.workspace.notes().len(), 1);
    }

    #[tokio::test]
    async fn generate_summary_round_trip() {
        let (state, _, counting) = state();
        let request = SummaryRequest {
            api_key: "sk".into(),
            prompt: "p".into(),
            updates: "did a thing".into(),
        };
        let reply = dispatch(&state, &HeadlessShell, BridgeRequest::GenerateSummary(request))
            .await
            .unwrap();
        assert!(matches!(reply, Some(BridgeEvent::SummaryGenerated { .. })));
        assert_eq!(counting.calls(), 1);
    }

    #[tokio::test]
    async fn generate_summary_without_key_is_refused() {
        let (state, _, counting) = state();
        let request = SummaryRequest {
            api_key: String::new(),
            prompt: "p".into(),
            updates: "did a thing".into(),
        };
        let err = dispatch(&state, &HeadlessShell, BridgeRequest::GenerateSummary(request))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::MissingCredential));
        assert_eq!(counting.calls(), 0);
    }

    #[tokio::test]
    async fn visibility_messages_reach_the_shell() {
        let (state, _, _) = state();
        let shell = RecordingShell::default();
        for request in [
            BridgeRequest::OpenPopover,
            BridgeRequest::ClosePopover,
            BridgeRequest::CloseApp,
        ] {
            assert!(dispatch(&state, &shell, request).await.unwrap().is_none());
        }
        assert_eq!(
            *shell.calls.lock().unwrap(),
            ["openPopover", "closePopover", "closeApp"]
        );
    }
}
