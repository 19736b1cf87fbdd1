//! MCP (Model Context Protocol) server for Anki.
//!
//! This crate implements the MCP protocol over JSON-RPC 2.0 and exposes the
//! Anki tools and `anki://` resources to LLM clients.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: Pluggable transport layer (stdio, channels)
//! - **server**: MCP server wrapping a `ToolRegistry` and the resources
//! - **resources**: `anki://` URI parsing and reads
//! - **error**: Unified error types
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use ankimcp_anki::{AnkiClient, SchemaCache};
//! use ankimcp_core::AnkiConnectConfig;
//! use ankimcp_mcp::server::McpServer;
//! use ankimcp_mcp::transport::StdioTransport;
//! use ankimcp_tool_runtime::{register_anki_tools, AnkiState, ToolRegistry};
//!
//! # async fn example() {
//! let client = Arc::new(AnkiClient::new(AnkiConnectConfig::default()).unwrap());
//! let state = AnkiState::new(client.clone(), Arc::new(SchemaCache::new(client)));
//! let mut registry = ToolRegistry::new();
//! register_anki_tools(&mut registry, state.clone()).unwrap();
//! let mut server = McpServer::new(registry, state);
//! let mut transport = StdioTransport::new();
//! server.run(&mut transport).await.unwrap();
//! # }
//! ```

pub mod error;
pub mod resources;
pub mod server;
pub mod transport;
pub mod types;

pub use error::McpError;
pub use resources::{AnkiResource, ResourceProvider};
pub use server::McpServer;
pub use transport::{ChannelTransport, McpTransport, StdioTransport};
pub use types::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use ankimcp_anki::transport::mock::ScriptedTransport;
    use ankimcp_anki::{AnkiClient, AnkiTransport, SchemaCache};
    use ankimcp_core::AnkiConnectConfig;
    use ankimcp_tool_runtime::AnkiState;
    use serde_json::json;

    /// Single-attempt client over a collection with one deck and one note type.
    pub fn anki_state() -> (AnkiState, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        transport.always_ok("version", json!(6));
        transport.always_ok("deckNames", json!(["Default"]));
        transport.always_ok("modelNames", json!(["Basic"]));
        transport.always_ok("modelFieldNames", json!(["Front", "Back"]));
        transport.always_ok(
            "modelTemplates",
            json!({"Card 1": {"Front": "{{Front}}", "Back": "{{Back}}"}}),
        );
        transport.always_ok("modelStyling", json!({"css": ".card {}"}));

        let config = AnkiConnectConfig {
            max_attempts: 1,
            ..Default::default()
        };
        let client = Arc::new(AnkiClient::with_transport(
            config,
            transport.clone() as Arc<dyn AnkiTransport>,
        ));
        let cache = Arc::new(SchemaCache::new(client.clone()));
        (AnkiState::new(client, cache), transport)
    }
}
