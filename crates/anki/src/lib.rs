//! AnkiConnect bridge for ankimcp.
//!
//! # Architecture
//!
//! - **transport**: one HTTP attempt against AnkiConnect (`{action, version, params}`)
//! - **client**: typed operations with retry, exponential backoff and error normalization
//! - **cache**: note-type schema cache with a cache-wide freshness window
//! - **error**: raw transport failures and their normalized classification
//! - **types**: wire envelope and note / note-type data model

pub mod cache;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use cache::{SchemaCache, DEFAULT_SCHEMA_TTL};
pub use client::{backoff_delay, AnkiClient};
pub use error::{normalize, AnkiError, TransportError, TransportErrorKind};
pub use transport::{AnkiTransport, HttpTransport};
pub use types::*;
