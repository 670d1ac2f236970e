use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{UpdateError, UpdateResult};
use crate::storage::SettingsBackend;
use crate::types::{parse_iso8601, to_iso8601};

pub const DEFAULT_SUMMARY_PROMPT: &str = "Create a concise summary of these weekly updates for a UX. \
This summary will be shared as a weekly team Slack message that highlights key information for the team. \
Keep the tone fun and light. Be encouraging and actionable.";

// Persistence keys.
pub const KEY_API_KEY: &str = "openaiApiKey";
pub const KEY_SUMMARY_PROMPT: &str = "summaryPrompt";
pub const KEY_AUTO_SUMMARY: &str = "autoSummaryEnabled";
pub const KEY_LAST_AUTO_SUMMARY: &str = "lastAutoSummaryAt";

/// User preferences edited through the settings form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_prompt")]
    pub summary_prompt: String,
    #[serde(default = "default_true")]
    pub auto_summary_enabled: bool,
}

fn default_prompt() -> String {
    DEFAULT_SUMMARY_PROMPT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            summary_prompt: default_prompt(),
            auto_summary_enabled: true,
        }
    }
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The stored prompt, or the built-in one if the stored value is blank.
    pub fn effective_prompt(&self) -> &str {
        if self.summary_prompt.trim().is_empty() {
            DEFAULT_SUMMARY_PROMPT
        } else {
            &self.summary_prompt
        }
    }

    /// Settings-form "Reset" button. Only touches the draft; nothing is
    /// written until [`SettingsStore::save`].
    pub fn reset_prompt(&mut self) {
        self.summary_prompt = default_prompt();
    }
}

/// Loads and saves [`Settings`] through a key/value backend and keeps the
/// last loaded copy around.
pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    current: Settings,
}

impl SettingsStore {
    pub fn new(backend: Box<dyn SettingsBackend>) -> Self {
        Self {
            backend,
            current: Settings::default(),
        }
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    /// Read all keys; any that are missing fall back to their defaults.
    pub fn load(&mut self) -> UpdateResult<&Settings> {
        let get = |key: &str| self.backend.get(key).map_err(UpdateError::Persistence);

        let api_key = get(KEY_API_KEY)?.unwrap_or_default();
        let summary_prompt = get(KEY_SUMMARY_PROMPT)?
            .filter(|p| !p.is_empty())
            .unwrap_or_else(default_prompt);
        let auto_summary_enabled = get(KEY_AUTO_SUMMARY)?.map_or(true, |v| v == "true");

        self.current = Settings {
            api_key,
            summary_prompt,
            auto_summary_enabled,
        };
        Ok(&self.current)
    }

    /// Persist all three fields together. The in-memory copy only changes
    /// once the write succeeded.
    pub fn save(&mut self, settings: Settings) -> UpdateResult<()> {
        self.backend
            .set_many(&[
                (KEY_API_KEY, settings.api_key.clone()),
                (KEY_SUMMARY_PROMPT, settings.summary_prompt.clone()),
                (KEY_AUTO_SUMMARY, settings.auto_summary_enabled.to_string()),
            ])
            .map_err(UpdateError::Persistence)?;
        self.current = settings;
        tracing::info!("Settings saved");
        Ok(())
    }

    /// When the scheduler last produced a summary on its own.
    pub fn last_auto_summary(&self) -> UpdateResult<Option<DateTime<Utc>>> {
        let raw = self
            .backend
            .get(KEY_LAST_AUTO_SUMMARY)
            .map_err(UpdateError::Persistence)?;
        Ok(raw.and_then(|r| {
            parse_iso8601(&r)
                .map_err(|e| tracing::warn!("Ignoring unreadable {KEY_LAST_AUTO_SUMMARY}: {e}"))
                .ok()
        }))
    }

    pub fn record_auto_summary(&mut self, at: DateTime<Utc>) -> UpdateResult<()> {
        self.backend
            .set_many(&[(KEY_LAST_AUTO_SUMMARY, to_iso8601(&at))])
            .map_err(UpdateError::Persistence)
    }
}
