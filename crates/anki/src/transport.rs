//! Transport layer for AnkiConnect requests.
//!
//! An [`AnkiTransport`] performs exactly one attempt: it sends one
//! `{action, version, params}` body and returns the `result` or a raw
//! [`TransportError`]. Retry and classification live in the client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{TransportError, TransportErrorKind};
use crate::types::{ActionRequest, ActionResponse};

#[async_trait]
pub trait AnkiTransport: Send + Sync {
    /// Send a single request attempt.
    async fn invoke(&self, request: &ActionRequest) -> Result<Value, TransportError>;
}

/// HTTP transport posting JSON to the AnkiConnect endpoint.
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose every request is bounded by `timeout`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::from_reqwest)?;
        Ok(Self {
            url: url.to_string(),
            http,
        })
    }
}

#[async_trait]
impl AnkiTransport for HttpTransport {
    async fn invoke(&self, request: &ActionRequest) -> Result<Value, TransportError> {
        let resp = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::new(
                TransportErrorKind::Http,
                format!("AnkiConnect returned {status}: {body}"),
            ));
        }

        let body: ActionResponse = resp.json().await.map_err(TransportError::from_reqwest)?;
        body.into_result()
    }
}

/// Scripted transport for testing the client and cache without Anki.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::time::Instant;

    type Outcome = Result<Value, TransportError>;

    /// A transport that replays pre-configured outcomes per action.
    ///
    /// Queued outcomes are consumed first (FIFO); once an action's queue is
    /// empty its sticky outcome, if any, is returned on every call.
    pub struct ScriptedTransport {
        queued: Mutex<HashMap<String, VecDeque<Outcome>>>,
        sticky: Mutex<HashMap<String, Outcome>>,
        calls: Mutex<Vec<(Instant, ActionRequest)>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self {
                queued: Mutex::new(HashMap::new()),
                sticky: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Queue a one-shot outcome for the next call of `action`.
        pub fn queue(&self, action: &str, outcome: Outcome) {
            self.queued
                .lock()
                .unwrap()
                .entry(action.to_string())
                .or_default()
                .push_back(outcome);
        }

        pub fn queue_ok(&self, action: &str, result: Value) {
            self.queue(action, Ok(result));
        }

        pub fn queue_err(&self, action: &str, err: TransportError) {
            self.queue(action, Err(err));
        }

        /// Answer every call of `action` with `outcome` once its queue is drained.
        pub fn always(&self, action: &str, outcome: Outcome) {
            self.sticky
                .lock()
                .unwrap()
                .insert(action.to_string(), outcome);
        }

        pub fn always_ok(&self, action: &str, result: Value) {
            self.always(action, Ok(result));
        }

        /// All requests seen so far, in arrival order.
        pub fn requests(&self) -> Vec<ActionRequest> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, req)| req.clone())
                .collect()
        }

        /// Arrival times of the calls of `action`.
        pub fn call_times(&self, action: &str) -> Vec<Instant> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, req)| req.action == action)
                .map(|(at, _)| *at)
                .collect()
        }

        pub fn call_count(&self, action: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, req)| req.action == action)
                .count()
        }

        pub fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Default for ScriptedTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl AnkiTransport for ScriptedTransport {
        async fn invoke(&self, request: &ActionRequest) -> Result<Value, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((Instant::now(), request.clone()));

            let queued = self
                .queued
                .lock()
                .unwrap()
                .get_mut(&request.action)
                .and_then(|q| q.pop_front());
            if let Some(outcome) = queued {
                return outcome;
            }

            self.sticky
                .lock()
                .unwrap()
                .get(&request.action)
                .cloned()
                .unwrap_or_else(|| {
                    Err(TransportError::remote(format!(
                        "unsupported action: {}",
                        request.action
                    )))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn_anki(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn fake_anki(Json(body): Json<Value>) -> Json<Value> {
        let reply = match body["action"].as_str() {
            Some("version") => serde_json::json!({"result": body["version"], "error": null}),
            Some("deckNames") => serde_json::json!({"result": ["Default", "Spanish"], "error": null}),
            Some("guiBusy") => serde_json::json!({"result": null, "error": "collection is not available"}),
            _ => serde_json::json!({"result": null, "error": "unsupported action"}),
        };
        Json(reply)
    }

    fn request(action: &str) -> ActionRequest {
        ActionRequest::new(action, 6, serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_http_transport_success() {
        let url = spawn_anki(Router::new().route("/", post(fake_anki))).await;
        let transport = HttpTransport::new(&url, Duration::from_secs(2)).unwrap();

        let version = transport.invoke(&request("version")).await.unwrap();
        assert_eq!(version, serde_json::json!(6));

        let decks = transport.invoke(&request("deckNames")).await.unwrap();
        assert_eq!(decks, serde_json::json!(["Default", "Spanish"]));
    }

    #[tokio::test]
    async fn test_http_transport_remote_error() {
        let url = spawn_anki(Router::new().route("/", post(fake_anki))).await;
        let transport = HttpTransport::new(&url, Duration::from_secs(2)).unwrap();

        let err = transport.invoke(&request("guiBusy")).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Remote);
        assert_eq!(err.message, "collection is not available");
    }

    #[tokio::test]
    async fn test_http_transport_connection_refused() {
        // Grab a free port, then close it so nothing is listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            HttpTransport::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = transport.invoke(&request("version")).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Connect);
    }

    #[tokio::test]
    async fn test_http_transport_timeout() {
        async fn slow(Json(_body): Json<Value>) -> Json<Value> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Json(serde_json::json!({"result": 6, "error": null}))
        }
        let url = spawn_anki(Router::new().route("/", post(slow))).await;
        let transport = HttpTransport::new(&url, Duration::from_millis(50)).unwrap();

        let err = transport.invoke(&request("version")).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_http_transport_bad_envelope() {
        async fn garbage() -> &'static str {
            "not json"
        }
        let url = spawn_anki(Router::new().route("/", post(garbage))).await;
        let transport = HttpTransport::new(&url, Duration::from_secs(2)).unwrap();

        let err = transport.invoke(&request("version")).await.unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::Decode);
    }
}
