//! Error types for AnkiConnect operations.
//!
//! Raw transport failures ([`TransportError`]) are classified into an
//! [`AnkiError`] by [`normalize`] before they ever leave the client.

pub(crate) const CONNECTION_MESSAGE: &str =
    "Unable to connect to Anki. Please make sure Anki is running and the AnkiConnect plugin is enabled.";
pub(crate) const TIMEOUT_MESSAGE: &str =
    "Connection to Anki timed out. Anki may be unresponsive; check that it is not busy and try again.";
pub(crate) const COLLECTION_MESSAGE: &str =
    "Anki collection is not available. Please close any open dialogs in Anki and try again.";

/// Error code attached to [`AnkiError::Api`] when Anki is blocked by a modal dialog.
pub const COLLECTION_UNAVAILABLE: &str = "collection_unavailable";

/// Errors surfaced by the AnkiConnect client and the schema cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnkiError {
    /// Anki is not running or AnkiConnect is unreachable.
    #[error("{0}")]
    Connection(String),

    /// Anki did not answer within the request deadline.
    #[error("{0}")]
    Timeout(String),

    /// Anki answered with an application-level error.
    #[error("{message}")]
    Api {
        message: String,
        code: Option<String>,
    },

    /// Caller-supplied arguments are invalid or reference something that
    /// does not exist. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Any other failure, carrying the original message.
    #[error("{0}")]
    Other(String),
}

impl AnkiError {
    pub fn validation(message: impl Into<String>) -> Self {
        AnkiError::Validation(message.into())
    }

    pub fn api(message: impl Into<String>) -> Self {
        AnkiError::Api {
            message: message.into(),
            code: None,
        }
    }

    /// Whether this error means AnkiConnect could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AnkiError::Connection(_) | AnkiError::Timeout(_))
    }
}

/// Classification of a raw failure as reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// TCP connection could not be established.
    Connect,
    /// The request deadline elapsed.
    Timeout,
    /// Non-success HTTP status or other request failure.
    Http,
    /// AnkiConnect returned a non-null `error` field.
    Remote,
    /// The response body was not a valid `{result, error}` envelope.
    Decode,
    /// A failure with no error structure, only a string form.
    Opaque,
}

/// A raw, unclassified failure from one attempt against AnkiConnect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Remote, message)
    }

    pub fn opaque(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Opaque, message)
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        // reqwest's Display omits the io cause; walk the chain so the
        // message signatures ("Connection refused", ...) stay visible.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_decode() {
            TransportErrorKind::Decode
        } else {
            TransportErrorKind::Http
        };
        Self { kind, message }
    }
}

// Remote errors echo user-supplied names (decks, note types), so only
// transport-level failures are matched against the message signatures.
fn is_connection_refused(err: &TransportError, lower: &str) -> bool {
    match err.kind {
        TransportErrorKind::Connect => true,
        TransportErrorKind::Remote => false,
        _ => lower.contains("econnrefused") || lower.contains("connection refused"),
    }
}

fn is_timeout(err: &TransportError, lower: &str) -> bool {
    match err.kind {
        TransportErrorKind::Timeout => true,
        TransportErrorKind::Remote => false,
        _ => {
            lower.contains("etimedout") || lower.contains("timed out") || lower.contains("timeout")
        }
    }
}

/// Classify a raw transport failure.
///
/// Checked in priority order: connection refused, timeout, collection
/// unavailable, then pass-through of the remaining failures.
pub fn normalize(err: TransportError) -> AnkiError {
    let lower = err.message.to_lowercase();

    if is_connection_refused(&err, &lower) {
        return AnkiError::Connection(CONNECTION_MESSAGE.to_string());
    }
    if is_timeout(&err, &lower) {
        return AnkiError::Timeout(TIMEOUT_MESSAGE.to_string());
    }
    if lower.contains("collection is not available") {
        return AnkiError::Api {
            message: COLLECTION_MESSAGE.to_string(),
            code: Some(COLLECTION_UNAVAILABLE.to_string()),
        };
    }

    match err.kind {
        TransportErrorKind::Remote => AnkiError::Api {
            message: err.message,
            code: None,
        },
        TransportErrorKind::Http | TransportErrorKind::Decode => AnkiError::Other(err.message),
        TransportErrorKind::Opaque => {
            AnkiError::Other(format!("Unexpected AnkiConnect failure: {}", err.message))
        }
        // Already caught by the signature checks above.
        TransportErrorKind::Connect => AnkiError::Connection(CONNECTION_MESSAGE.to_string()),
        TransportErrorKind::Timeout => AnkiError::Timeout(TIMEOUT_MESSAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_kind_maps_to_connection() {
        let err = normalize(TransportError::connect("error sending request"));
        assert_eq!(err, AnkiError::Connection(CONNECTION_MESSAGE.to_string()));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_refused_signature_in_message() {
        let err = normalize(TransportError::new(
            TransportErrorKind::Http,
            "request failed: connect ECONNREFUSED 127.0.0.1:8765",
        ));
        assert!(matches!(err, AnkiError::Connection(_)));
        assert!(err.to_string().contains("AnkiConnect plugin"));
    }

    #[test]
    fn test_timeout_signature() {
        let err = normalize(TransportError::new(
            TransportErrorKind::Http,
            "operation timed out",
        ));
        assert!(matches!(err, AnkiError::Timeout(_)));
        assert!(err.to_string().contains("unresponsive"));
    }

    #[test]
    fn test_refused_wins_over_timeout() {
        let err = normalize(TransportError::timeout("connection refused after timeout"));
        assert!(matches!(err, AnkiError::Connection(_)));
    }

    #[test]
    fn test_collection_unavailable() {
        let err = normalize(TransportError::remote(
            "collection is not available",
        ));
        match err {
            AnkiError::Api { message, code } => {
                assert!(message.contains("close any open dialogs"));
                assert_eq!(code.as_deref(), Some(COLLECTION_UNAVAILABLE));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_remote_error_passes_through() {
        let err = normalize(TransportError::remote("model was not found: Basic"));
        assert_eq!(err, AnkiError::api("model was not found: Basic"));
    }

    #[test]
    fn test_remote_error_naming_timeout_stays_api() {
        let err = normalize(TransportError::remote("deck was not found: Timeout Drills"));
        assert_eq!(err, AnkiError::api("deck was not found: Timeout Drills"));
        assert!(!err.is_unavailable());

        let err = normalize(TransportError::remote("model was not found: Connection refused"));
        assert!(matches!(err, AnkiError::Api { .. }));
    }

    #[test]
    fn test_decode_error_passes_through() {
        let err = normalize(TransportError::new(
            TransportErrorKind::Decode,
            "expected value at line 1 column 1",
        ));
        assert_eq!(err, AnkiError::Other("expected value at line 1 column 1".to_string()));
    }

    #[test]
    fn test_opaque_failure_is_wrapped() {
        let err = normalize(TransportError::opaque("boom"));
        assert_eq!(
            err,
            AnkiError::Other("Unexpected AnkiConnect failure: boom".to_string())
        );
    }
}
