//! Resilient AnkiConnect client.
//!
//! Every operation becomes one `{action, version, params}` request per
//! attempt. Failed attempts are normalized and retried with exponential
//! backoff until the configured attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use ankimcp_core::AnkiConnectConfig;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{normalize, AnkiError, CONNECTION_MESSAGE};
use crate::transport::{AnkiTransport, HttpTransport};
use crate::types::{ActionRequest, CardTemplate, ModelStyling, NewModel, NewNote, NoteInfo};

const BASE_BACKOFF_MS: u64 = 1_000;

/// Delay before retrying after the attempt at `attempt_index` (0-based):
/// `min(1000ms * 2^attempt_index, ceiling)`.
pub fn backoff_delay(attempt_index: u32, ceiling: Duration) -> Duration {
    let ms = BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt_index));
    Duration::from_millis(ms).min(ceiling)
}

/// Client for the AnkiConnect HTTP API.
///
/// Holds no mutable state beyond the immutable config, so calls may be
/// issued concurrently from any number of tasks.
pub struct AnkiClient {
    config: AnkiConnectConfig,
    transport: Arc<dyn AnkiTransport>,
}

impl AnkiClient {
    /// Build a client speaking HTTP to `config.url`.
    pub fn new(config: AnkiConnectConfig) -> Result<Self, AnkiError> {
        let transport =
            HttpTransport::new(&config.url, config.timeout()).map_err(normalize)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a client over an arbitrary transport.
    pub fn with_transport(config: AnkiConnectConfig, transport: Arc<dyn AnkiTransport>) -> Self {
        Self { config, transport }
    }

    pub fn default_deck(&self) -> &str {
        &self.config.default_deck
    }

    /// Run `action` through the retry loop and return the raw `result`.
    async fn invoke_raw(&self, action: &str, params: Value) -> Result<Value, AnkiError> {
        let request = ActionRequest::new(action, self.config.api_version, params);
        let attempts = self.config.max_attempts;
        let ceiling = self.config.retry_ceiling();
        let mut last_error = None;

        for attempt in 0..attempts {
            debug!(action = %action, attempt = attempt + 1, "Sending AnkiConnect request");
            match self.transport.invoke(&request).await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(action = %action, attempt = attempt + 1, "AnkiConnect request recovered");
                    }
                    return Ok(result);
                }
                Err(raw) => {
                    let err = normalize(raw);
                    if attempt + 1 < attempts {
                        let delay = backoff_delay(attempt, ceiling);
                        warn!(
                            action = %action,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "AnkiConnect request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(action = %action, attempts, error = %err, "AnkiConnect request failed");
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AnkiError::Connection(CONNECTION_MESSAGE.to_string())))
    }

    async fn invoke<R: DeserializeOwned>(&self, action: &str, params: Value) -> Result<R, AnkiError> {
        let result = self.invoke_raw(action, params).await?;
        serde_json::from_value(result).map_err(|e| {
            AnkiError::Other(format!("Unexpected AnkiConnect response to '{action}': {e}"))
        })
    }

    // ── Connectivity ────────────────────────────────────────────────

    /// Probe AnkiConnect and return its API version.
    pub async fn check_connection(&self) -> Result<u32, AnkiError> {
        self.invoke("version", json!({})).await
    }

    // ── Decks ───────────────────────────────────────────────────────

    pub async fn deck_names(&self) -> Result<Vec<String>, AnkiError> {
        self.invoke("deckNames", json!({})).await
    }

    /// Create a deck (idempotent on the Anki side) and return its id.
    pub async fn create_deck(&self, name: &str) -> Result<u64, AnkiError> {
        self.invoke("createDeck", json!({ "deck": name })).await
    }

    // ── Note types ──────────────────────────────────────────────────

    pub async fn model_names(&self) -> Result<Vec<String>, AnkiError> {
        self.invoke("modelNames", json!({})).await
    }

    pub async fn model_field_names(&self, model_name: &str) -> Result<Vec<String>, AnkiError> {
        self.invoke("modelFieldNames", json!({ "modelName": model_name }))
            .await
    }

    pub async fn model_templates(
        &self,
        model_name: &str,
    ) -> Result<IndexMap<String, CardTemplate>, AnkiError> {
        self.invoke("modelTemplates", json!({ "modelName": model_name }))
            .await
    }

    pub async fn model_styling(&self, model_name: &str) -> Result<ModelStyling, AnkiError> {
        self.invoke("modelStyling", json!({ "modelName": model_name }))
            .await
    }

    pub async fn create_model(&self, model: &NewModel) -> Result<(), AnkiError> {
        self.invoke_raw("createModel", model.to_params()).await?;
        Ok(())
    }

    // ── Notes ───────────────────────────────────────────────────────

    /// Add one note. `None` means Anki refused it without an error message.
    pub async fn add_note(&self, note: &NewNote) -> Result<Option<u64>, AnkiError> {
        self.invoke("addNote", json!({ "note": note })).await
    }

    /// Add several notes in one request; one slot per input, `None` for failures.
    pub async fn add_notes(&self, notes: &[NewNote]) -> Result<Vec<Option<u64>>, AnkiError> {
        self.invoke("addNotes", json!({ "notes": notes })).await
    }

    pub async fn find_notes(&self, query: &str) -> Result<Vec<u64>, AnkiError> {
        self.invoke("findNotes", json!({ "query": query })).await
    }

    /// Fetch note details. Ids that no longer exist are skipped.
    pub async fn notes_info(&self, ids: &[u64]) -> Result<Vec<NoteInfo>, AnkiError> {
        // AnkiConnect answers `{}` for unknown ids.
        let raw: Vec<Value> = self.invoke("notesInfo", json!({ "notes": ids })).await?;
        raw.into_iter()
            .filter(|v| v.get("noteId").is_some())
            .map(|v| {
                serde_json::from_value(v).map_err(|e| {
                    AnkiError::Other(format!("Unexpected AnkiConnect response to 'notesInfo': {e}"))
                })
            })
            .collect()
    }

    pub async fn update_note_fields(
        &self,
        id: u64,
        fields: &IndexMap<String, String>,
    ) -> Result<(), AnkiError> {
        self.invoke_raw(
            "updateNoteFields",
            json!({ "note": { "id": id, "fields": fields } }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_notes(&self, ids: &[u64]) -> Result<(), AnkiError> {
        self.invoke_raw("deleteNotes", json!({ "notes": ids }))
            .await?;
        Ok(())
    }
}
