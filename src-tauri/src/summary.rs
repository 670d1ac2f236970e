use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::SummaryConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::settings::Settings;
use crate::types::Note;

pub const SIMULATED_SUMMARY: &str = "This is a simulated AI summary for testing. \
With a configured API key this would be generated from your weekly updates.";

/// Everything the text-generation service needs. Also the payload of the
/// `generateSummary` bridge message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub api_key: String,
    pub prompt: String,
    /// Note contents joined by blank lines.
    pub updates: String,
}

impl SummaryRequest {
    /// Checks run in this order: no notes, then no key. Neither reaches the network.
    pub fn build(notes: &[Note], settings: &Settings) -> UpdateResult<Self> {
        if notes.is_empty() {
            return Err(UpdateError::EmptyInput);
        }
        if !settings.has_api_key() {
            return Err(UpdateError::MissingCredential);
        }
        Ok(Self {
            api_key: settings.api_key.trim().to_string(),
            prompt: settings.effective_prompt().to_string(),
            updates: join_contents(notes),
        })
    }

    /// Same preconditions for a request that arrived already assembled.
    pub fn validate(&self) -> UpdateResult<()> {
        if self.updates.trim().is_empty() {
            return Err(UpdateError::EmptyInput);
        }
        if self.api_key.trim().is_empty() {
            return Err(UpdateError::MissingCredential);
        }
        Ok(())
    }
}

pub fn join_contents(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|n| n.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The external text-generation service. One request, one response.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    async fn generate(&self, request: &SummaryRequest) -> UpdateResult<String>;
}

/// OpenAI-compatible chat completions.
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(config: &SummaryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl SummaryBackend for OpenAiBackend {
    async fn generate(&self, request: &SummaryRequest) -> UpdateResult<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.prompt },
                { "role": "user", "content": request.updates },
            ],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&request.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpdateError::Generation(format!(
                "OpenAI API {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| UpdateError::Generation("response did not include any text".into()))
    }
}

/// Stand-in when no real service should be called: returns a fixed text
/// after an optional delay.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    pub delay: Duration,
}

#[async_trait]
impl SummaryBackend for SimulatedBackend {
    async fn generate(&self, _request: &SummaryRequest) -> UpdateResult<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(SIMULATED_SUMMARY.to_string())
    }
}

/// Front door to a [`SummaryBackend`] with a busy flag, so the trigger
/// control stays disabled while a call is out and a second call is refused.
/// Clones share the flag.
#[derive(Clone)]
pub struct SummaryGenerator {
    backend: Arc<dyn SummaryBackend>,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag on drop, whichever way the call ended.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SummaryGenerator {
    pub fn new(backend: Arc<dyn SummaryBackend>) -> Self {
        Self {
            backend,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Backend picked from config: simulated, or OpenAI.
    pub fn from_config(config: &SummaryConfig) -> anyhow::Result<Self> {
        let backend: Arc<dyn SummaryBackend> = if config.simulate {
            tracing::info!("Summary backend: simulated");
            Arc::new(SimulatedBackend {
                delay: Duration::from_secs(2),
            })
        } else {
            Arc::new(OpenAiBackend::new(config)?)
        };
        Ok(Self::new(backend))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn generate(&self, notes: &[Note], settings: &Settings) -> UpdateResult<String> {
        let request = SummaryRequest::build(notes, settings)?;
        self.submit(request).await
    }

    pub async fn submit(&self, request: SummaryRequest) -> UpdateResult<String> {
        request.validate()?;
        let _guard = self.acquire()?;

        tracing::info!("Generating summary");
        match self.backend.generate(&request).await {
            Ok(summary) => {
                tracing::info!(chars = summary.len(), "Summary generated");
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!("Summary generation failed: {e}");
                Err(match e {
                    UpdateError::Generation(_) => e,
                    other => UpdateError::Generation(other.to_string()),
                })
            }
        }
    }

    fn acquire(&self) -> UpdateResult<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| UpdateError::SummaryInProgress)?;
        Ok(BusyGuard(self.busy.clone()))
    }
}
