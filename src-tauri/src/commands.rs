use std::time::Duration;

use chrono::Local;
use tauri::{Emitter, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use crate::bridge::{BridgeEvent, BridgeRequest, ShellControl};
use crate::confirm::Decision;
use crate::error::UpdateError;
use crate::scheduler::AutoOutcome;
use crate::settings::{Settings, DEFAULT_SUMMARY_PROMPT};
use crate::summary::SummaryRequest;
use crate::types::NoteId;
use crate::workspace::Snapshot;
use crate::AppMutex;

// ─── Tauri commands ────────────────────────────────────────────────────────────

/// Full popover state. Called once when the web view loads.
#[tauri::command]
pub async fn get_view(state: tauri::State<'_, AppMutex>) -> Result<Snapshot, String> {
    Ok(state.lock().await.workspace.snapshot())
}

/// Editor submit: adds in create mode, updates in edit mode.
/// Blank input is accepted and ignored.
#[tauri::command]
pub async fn submit_update(
    text: String,
    state: tauri::State<'_, AppMutex>,
    app: tauri::AppHandle,
) -> Result<Snapshot, String> {
    let (result, snapshot) = {
        let mut s = state.lock().await;
        let result = s.workspace.submit(&text);
        (result, s.workspace.snapshot())
    };
    // Re-render even on failure: a failed save still changed the list in memory.
    let _ = app.emit("updates-changed", &snapshot);
    result.map(|_| snapshot).map_err(|e| report(&app, e))
}

#[tauri::command]
pub async fn begin_edit(
    id: NoteId,
    state: tauri::State<'_, AppMutex>,
    app: tauri::AppHandle,
) -> Result<Snapshot, String> {
    let mut s = state.lock().await;
    s.workspace.begin_edit(id).map_err(|e| report(&app, e))?;
    Ok(s.workspace.snapshot())
}

#[tauri::command]
pub async fn cancel_edit(state: tauri::State<'_, AppMutex>) -> Result<Snapshot, String> {
    let mut s = state.lock().await;
    s.workspace.cancel_edit();
    Ok(s.workspace.snapshot())
}

/// Open the delete confirmation for `id`. Nothing is removed until
/// `resolve_confirmation` comes back with `confirm`.
#[tauri::command]
pub async fn request_delete(
    id: NoteId,
    state: tauri::State<'_, AppMutex>,
    app: tauri::AppHandle,
) -> Result<Snapshot, String> {
    let mut s = state.lock().await;
    s.workspace.request_delete(id).map_err(|e| report(&app, e))?;
    Ok(s.workspace.snapshot())
}

#[tauri::command]
pub async fn resolve_confirmation(
    decision: Decision,
    state: tauri::State<'_, AppMutex>,
    app: tauri::AppHandle,
) -> Result<Snapshot, String> {
    let (result, snapshot) = {
        let mut s = state.lock().await;
        let result = s.workspace.resolve_pending(decision);
        (result, s.workspace.snapshot())
    };
    let _ = app.emit("updates-changed", &snapshot);
    result.map(|_| snapshot).map_err(|e| report(&app, e))
}

#[tauri::command]
pub async fn get_settings(state: tauri::State<'_, AppMutex>) -> Result<Settings, String> {
    Ok(state.lock().await.workspace.settings().clone())
}

#[tauri::command]
pub async fn save_settings(
    settings: Settings,
    state: tauri::State<'_, AppMutex>,
    app: tauri::AppHandle,
) -> Result<Settings, String> {
    let mut s = state.lock().await;
    s.workspace
        .save_settings(settings)
        .map_err(|e| report(&app, e))?;
    Ok(s.workspace.settings().clone())
}

/// Text for the settings form's "Reset" button. Not persisted.
#[tauri::command]
pub async fn default_prompt() -> String {
    DEFAULT_SUMMARY_PROMPT.to_string()
}

/// Manual summary. `Ok(None)` when there is nothing to summarize.
/// The frontend keeps its button disabled until this returns.
#[tauri::command]
pub async fn generate_summary(
    state: tauri::State<'_, AppMutex>,
    app: tauri::AppHandle,
) -> Result<Option<String>, String> {
    // Build the request and clone the generator while holding the lock,
    // then release it before the network call.
    let (request, generator) = {
        let s = state.lock().await;
        let request = SummaryRequest::build(s.workspace.notes(), s.workspace.settings());
        (request, s.generator.clone())
    };

    let request = match request {
        Ok(r) => r,
        Err(UpdateError::EmptyInput) => {
            tracing::info!("No updates to summarize");
            return Ok(None);
        }
        Err(e) => return Err(report(&app, e)),
    };

    let _ = app.emit("summary-busy", true);
    let result = generator.submit(request).await;
    let _ = app.emit("summary-busy", false);
    match result {
        Ok(summary) => {
            let _ = app.emit("summary-generated", &summary);
            Ok(Some(summary))
        }
        Err(e) => Err(report(&app, e)),
    }
}

/// Typed message channel mirroring the classic web-view bridge.
#[tauri::command]
pub async fn bridge_message(
    request: BridgeRequest,
    state: tauri::State<'_, AppMutex>,
    app: tauri::AppHandle,
) -> Result<Option<BridgeEvent>, String> {
    let saves = matches!(request, BridgeRequest::SaveUpdates { .. });
    let shell = TauriShell { app: app.clone() };
    let reply = crate::bridge::dispatch(state.inner(), &shell, request)
        .await
        .map_err(|e| report(&app, e))?;
    if saves {
        let snapshot = state.lock().await.workspace.snapshot();
        let _ = app.emit("updates-changed", &snapshot);
    }
    Ok(reply)
}

// ─── Internal helpers ──────────────────────────────────────────────────────────

/// Launch check plus the hourly tick. Never returns.
pub async fn start_auto_summary(app: tauri::AppHandle, period: Duration) {
    crate::scheduler::run_schedule(period, || {
        let app = app.clone();
        async move {
            let state = app.state::<AppMutex>();
            let outcome = crate::scheduler::check_and_generate_with(
                state.inner(),
                Local::now(),
                |busy| {
                    let _ = app.emit("summary-busy", busy);
                },
            )
            .await;
            match outcome {
                Ok(AutoOutcome::Generated { summary, .. }) => {
                    let _ = app.emit("summary-generated", &summary);
                }
                Ok(_) => {}
                Err(UpdateError::EmptyInput) => {}
                Err(e) => {
                    report(&app, e);
                }
            }
        }
    })
    .await;
}

/// Turn an error into a user-visible notice and the string the frontend gets.
fn report(app: &tauri::AppHandle, err: UpdateError) -> String {
    let message = err.to_string();
    match &err {
        UpdateError::MissingCredential => {
            notice(app, "Please add your OpenAI API key in settings first! 🔑", MessageDialogKind::Info);
            let _ = app.emit("open-settings", ());
        }
        UpdateError::Persistence(_) => {
            tracing::warn!("{message}");
            notice(
                app,
                &format!("{message}\n\nYour changes are kept until the next successful save."),
                MessageDialogKind::Warning,
            );
        }
        UpdateError::Generation(_) => {
            tracing::warn!("{message}");
            let _ = app.emit("summary-failed", &message);
            notice(app, &message, MessageDialogKind::Error);
        }
        _ => tracing::info!("{message}"),
    }
    message
}

fn notice(app: &tauri::AppHandle, text: &str, kind: MessageDialogKind) {
    app.dialog()
        .message(text)
        .title("Weekly Updates")
        .kind(kind)
        .show(|_| {});
}

/// Popover visibility on top of the main window.
struct TauriShell {
    app: tauri::AppHandle,
}

impl ShellControl for TauriShell {
    fn close_app(&self) {
        self.app.exit(0);
    }

    fn open_popover(&self) {
        if let Some(window) = self.app.get_webview_window("main") {
            let _ = window.show();
            let _ = window.set_focus();
        }
    }

    fn close_popover(&self) {
        if let Some(window) = self.app.get_webview_window("main") {
            let _ = window.hide();
        }
    }
}
