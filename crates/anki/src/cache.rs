//! Note-type schema cache.
//!
//! Memoizes the three metadata lookups (field names, templates, styling)
//! needed to describe a note type. Staleness is cache-wide: a single
//! `last_update` stamp, shared by per-name entries and the "all schemas"
//! snapshot, decides whether anything may be served.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::client::AnkiClient;
use crate::error::AnkiError;
use crate::types::ModelSchema;

/// Default freshness window.
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Default)]
struct CacheState {
    schemas: HashMap<String, ModelSchema>,
    all: Option<Vec<ModelSchema>>,
    /// `None` is the epoch: nothing is fresh.
    last_update: Option<Instant>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.last_update
            .is_some_and(|stamp| stamp.elapsed() < ttl)
    }
}

/// Cache of [`ModelSchema`] snapshots backed by an [`AnkiClient`].
///
/// The lock is only held to read or write the map, never across a
/// remote call.
pub struct SchemaCache {
    client: Arc<AnkiClient>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl SchemaCache {
    pub fn new(client: Arc<AnkiClient>) -> Self {
        Self::with_ttl(client, DEFAULT_SCHEMA_TTL)
    }

    pub fn with_ttl(client: Arc<AnkiClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Return the schema of `name`, fetching it if absent or stale.
    ///
    /// Fails with [`AnkiError::Validation`] when Anki has no such note type;
    /// in that case no metadata is fetched.
    pub async fn get_schema(&self, name: &str) -> Result<ModelSchema, AnkiError> {
        {
            let state = self.state.lock().await;
            if state.is_fresh(self.ttl) {
                if let Some(schema) = state.schemas.get(name) {
                    debug!(model = %name, "Schema cache hit");
                    return Ok(schema.clone());
                }
            }
        }

        debug!(model = %name, "Schema cache miss, fetching");
        let names = self.client.model_names().await?;
        if !names.iter().any(|n| n == name) {
            return Err(AnkiError::validation(format!("Note type not found: {name}")));
        }

        let (fields, templates, styling) = tokio::try_join!(
            self.client.model_field_names(name),
            self.client.model_templates(name),
            self.client.model_styling(name),
        )?;

        let schema = ModelSchema {
            name: name.to_string(),
            fields,
            templates,
            css: styling.css,
        };

        let mut state = self.state.lock().await;
        if !state.is_fresh(self.ttl) {
            // A new stamp must not revive entries that already expired.
            *state = CacheState::default();
        }
        state.schemas.insert(name.to_string(), schema.clone());
        state.last_update = Some(Instant::now());
        Ok(schema)
    }

    /// Return the schemas of every note type, in Anki's order.
    ///
    /// Any failing lookup fails the whole call; no partial list is cached.
    pub async fn get_all_schemas(&self) -> Result<Vec<ModelSchema>, AnkiError> {
        {
            let state = self.state.lock().await;
            if state.is_fresh(self.ttl) {
                if let Some(all) = &state.all {
                    debug!(count = all.len(), "All-schemas cache hit");
                    return Ok(all.clone());
                }
            }
        }

        let names = self.client.model_names().await?;
        let schemas =
            futures::future::try_join_all(names.iter().map(|name| self.get_schema(name))).await?;

        let mut state = self.state.lock().await;
        state.all = Some(schemas.clone());
        state.last_update = Some(Instant::now());
        debug!(count = schemas.len(), "All-schemas cache refreshed");
        Ok(schemas)
    }

    /// Drop every entry and reset the freshness stamp.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = CacheState::default();
        debug!("Schema cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::AnkiTransport;
    use ankimcp_core::AnkiConnectConfig;
    use serde_json::json;

    fn cache() -> (SchemaCache, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let config = AnkiConnectConfig {
            max_attempts: 1,
            ..Default::default()
        };
        let client = AnkiClient::with_transport(config, transport.clone() as Arc<dyn AnkiTransport>);
        (SchemaCache::new(Arc::new(client)), transport)
    }

    fn script_basic(transport: &ScriptedTransport) {
        transport.always_ok("modelNames", json!(["Basic", "Cloze"]));
        transport.always_ok("modelFieldNames", json!(["Front", "Back"]));
        transport.always_ok(
            "modelTemplates",
            json!({"Card 1": {"Front": "{{Front}}", "Back": "{{FrontSide}}<hr id=answer>{{Back}}"}}),
        );
        transport.always_ok("modelStyling", json!({"css": ".card { font-family: arial; }"}));
    }

    fn metadata_calls(transport: &ScriptedTransport) -> usize {
        transport.call_count("modelFieldNames")
            + transport.call_count("modelTemplates")
            + transport.call_count("modelStyling")
    }

    /// Answers metadata actions after a fixed delay.
    struct SlowTransport {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl AnkiTransport for SlowTransport {
        async fn invoke(
            &self,
            request: &crate::types::ActionRequest,
        ) -> Result<serde_json::Value, TransportError> {
            match request.action.as_str() {
                "modelNames" => Ok(json!(["Basic"])),
                "modelFieldNames" => {
                    tokio::time::sleep(self.delay).await;
                    Ok(json!(["Front", "Back"]))
                }
                "modelTemplates" => {
                    tokio::time::sleep(self.delay).await;
                    Ok(json!({"Card 1": {"Front": "{{Front}}", "Back": "{{Back}}"}}))
                }
                "modelStyling" => {
                    tokio::time::sleep(self.delay).await;
                    Ok(json!({"css": ""}))
                }
                other => Err(TransportError::remote(format!("unsupported action: {other}"))),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_fetched_concurrently() {
        let config = AnkiConnectConfig {
            max_attempts: 1,
            ..Default::default()
        };
        let transport = Arc::new(SlowTransport {
            delay: Duration::from_secs(1),
        });
        let client = AnkiClient::with_transport(config, transport as Arc<dyn AnkiTransport>);
        let cache = SchemaCache::new(Arc::new(client));

        let start = Instant::now();
        let schema = cache.get_schema("Basic").await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(schema.fields, vec!["Front", "Back"]);
        assert!(elapsed >= Duration::from_secs(1), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_schema_cached_within_window() {
        let (cache, transport) = cache();
        script_basic(&transport);

        let first = cache.get_schema("Basic").await.unwrap();
        assert_eq!(first.fields, vec!["Front", "Back"]);
        assert_eq!(first.templates["Card 1"].front, "{{Front}}");
        assert_eq!(first.css, ".card { font-family: arial; }");
        assert_eq!(metadata_calls(&transport), 3);

        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache.get_schema("Basic").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(metadata_calls(&transport), 3);
        assert_eq!(transport.call_count("modelNames"), 1);

        tokio::time::advance(DEFAULT_SCHEMA_TTL).await;
        cache.get_schema("Basic").await.unwrap();
        assert_eq!(metadata_calls(&transport), 6);
    }

    #[tokio::test]
    async fn test_unknown_note_type_is_validation_error() {
        let (cache, transport) = cache();
        script_basic(&transport);

        let err = cache.get_schema("Nonexistent").await.unwrap_err();
        match err {
            AnkiError::Validation(msg) => assert!(msg.contains("Nonexistent")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(metadata_calls(&transport), 0);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let (cache, transport) = cache();
        script_basic(&transport);

        cache.get_schema("Basic").await.unwrap();
        cache.clear().await;
        cache.get_schema("Basic").await.unwrap();
        assert_eq!(metadata_calls(&transport), 6);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let (cache, transport) = cache();
        script_basic(&transport);
        transport.queue_err("modelStyling", TransportError::remote("model was not found: Basic"));

        let err = cache.get_schema("Basic").await.unwrap_err();
        assert_eq!(err, AnkiError::api("model was not found: Basic"));

        cache.get_schema("Basic").await.unwrap();
        assert_eq!(transport.call_count("modelStyling"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_schemas_snapshot() {
        let (cache, transport) = cache();
        script_basic(&transport);

        let all = cache.get_all_schemas().await.unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Basic", "Cloze"]);
        assert_eq!(metadata_calls(&transport), 6);

        // Served from the snapshot, and per-name lookups hit the map.
        cache.get_all_schemas().await.unwrap();
        cache.get_schema("Cloze").await.unwrap();
        assert_eq!(metadata_calls(&transport), 6);

        tokio::time::advance(DEFAULT_SCHEMA_TTL).await;
        cache.get_all_schemas().await.unwrap();
        assert_eq!(metadata_calls(&transport), 12);
    }

    #[tokio::test]
    async fn test_all_schemas_fails_as_a_whole() {
        let (cache, transport) = cache();
        transport.always_ok("modelNames", json!(["Basic", "Cloze", "Vocab"]));
        transport.always_ok("modelTemplates", json!({}));
        transport.always_ok("modelStyling", json!({"css": ""}));
        transport.queue_ok("modelFieldNames", json!(["Front", "Back"]));
        transport.queue_err("modelFieldNames", TransportError::remote("model was not found: Cloze"));
        transport.always_ok("modelFieldNames", json!(["Word"]));

        let err = cache.get_all_schemas().await.unwrap_err();
        assert!(matches!(err, AnkiError::Api { .. }));

        // No snapshot was stored: the next call goes back to Anki.
        let before = transport.call_count("modelNames");
        cache.get_all_schemas().await.unwrap();
        assert!(transport.call_count("modelNames") > before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_stamp_refreshes_older_entries() {
        let (cache, transport) = cache();
        script_basic(&transport);

        cache.get_schema("Basic").await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        cache.get_schema("Cloze").await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;

        // "Basic" is 400s old, but the last write was 200s ago.
        cache.get_schema("Basic").await.unwrap();
        assert_eq!(metadata_calls(&transport), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_expiry_drops_other_stale_entries() {
        let (cache, transport) = cache();
        script_basic(&transport);

        cache.get_schema("Basic").await.unwrap();
        cache.get_schema("Cloze").await.unwrap();
        tokio::time::advance(DEFAULT_SCHEMA_TTL).await;

        cache.get_schema("Basic").await.unwrap();
        cache.get_schema("Cloze").await.unwrap();
        assert_eq!(metadata_calls(&transport), 12);
    }
}
