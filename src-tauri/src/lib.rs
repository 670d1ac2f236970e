pub mod bridge;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod confirm;
pub mod db;
pub mod editor;
pub mod error;
pub mod scheduler;
pub mod settings;
pub mod storage;
pub mod store;
pub mod summary;
pub mod types;
pub mod view;
pub mod workspace;

use std::path::Path;

use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::db::SqliteBackend;
use crate::error::UpdateResult;
use crate::storage::{MemoryBackend, NoteBackend, SettingsBackend};
use crate::summary::SummaryGenerator;
use crate::workspace::Workspace;

/// All runtime state shared across Tauri commands and the scheduler.
pub struct AppState {
    /// Notes, editor, pending prompt and settings.
    pub workspace: Workspace,
    /// Cloned out of the lock before any network call; clones share the
    /// busy flag that keeps summary generation single-flight.
    pub generator: SummaryGenerator,
}

impl AppState {
    /// Build state over the given backends and load what they hold.
    pub fn new(
        notes: Box<dyn NoteBackend>,
        settings: Box<dyn SettingsBackend>,
        generator: SummaryGenerator,
    ) -> UpdateResult<Self> {
        let mut workspace = Workspace::new(notes, settings);
        workspace.load()?;
        Ok(Self {
            workspace,
            generator,
        })
    }

    /// Backends chosen from config: SQLite in `data_dir`, or memory only.
    pub fn open(config: &AppConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let (notes, settings): (Box<dyn NoteBackend>, Box<dyn SettingsBackend>) =
            if config.storage.in_memory {
                tracing::warn!("Storage is in-memory; updates will not survive a restart");
                let backend = MemoryBackend::new();
                (Box::new(backend.clone()), Box::new(backend))
            } else {
                let path = config.database_path(data_dir);
                tracing::info!("Opening update store at {}", path.display());
                (
                    Box::new(SqliteBackend::open(&path)?),
                    Box::new(SqliteBackend::open(&path)?),
                )
            };
        let generator = SummaryGenerator::from_config(&config.summary)?;
        Ok(Self::new(notes, settings, generator)?)
    }
}

/// Type alias used in Tauri command signatures and background tasks.
pub type AppMutex = Mutex<AppState>;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Only log WARN and above in production to avoid leaking note content
    #[cfg(debug_assertions)]
    tracing_subscriber::fmt::init();
    #[cfg(not(debug_assertions))]
    tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).init();

    use tauri::Manager;

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            commands::get_view,
            commands::submit_update,
            commands::begin_edit,
            commands::cancel_edit,
            commands::request_delete,
            commands::resolve_confirmation,
            commands::get_settings,
            commands::save_settings,
            commands::default_prompt,
            commands::generate_summary,
            commands::bridge_message,
        ])
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            let config = AppConfig::load(&data_dir)?;
            let state = AppState::open(&config, &data_dir)?;
            app.manage(AppMutex::new(state));

            let handle = app.handle().clone();
            let period = config.check_interval();
            tauri::async_runtime::spawn(async move {
                commands::start_auto_summary(handle, period).await;
            });
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
