//! Error types for the MCP crate.

use ankimcp_anki::AnkiError;

use crate::types::{error_codes, JsonRpcError};

/// Errors that can occur while serving MCP requests.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Failed to parse JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Transport I/O error.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The message is JSON but not a valid JSON-RPC request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested method is not supported.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters for a method.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// The requested tool was not found in the registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The requested resource URI is not served.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Anki rejected the request or could not be reached.
    #[error("{0}")]
    Anki(#[from] AnkiError),
}

impl McpError {
    /// Convert to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            McpError::JsonParse(_) => error_codes::PARSE_ERROR,
            McpError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_)
            | McpError::ToolNotFound(_)
            | McpError::ResourceNotFound(_)
            | McpError::Anki(AnkiError::Validation(_)) => error_codes::INVALID_PARAMS,
            McpError::Transport(_) | McpError::Anki(_) => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError {
            code,
            message: self.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anki_errors_map_by_kind() {
        let err = McpError::from(AnkiError::validation("Note type not found: Vocab"));
        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, error_codes::INVALID_PARAMS);
        assert_eq!(rpc.message, "Note type not found: Vocab");

        let err = McpError::from(AnkiError::Connection("start Anki".to_string()));
        assert_eq!(err.to_rpc_error().code, error_codes::INTERNAL_ERROR);
        assert_eq!(err.to_rpc_error().message, "start Anki");
    }

    #[test]
    fn test_protocol_errors() {
        assert_eq!(
            McpError::MethodNotFound("x".into()).to_rpc_error().code,
            error_codes::METHOD_NOT_FOUND
        );
        assert_eq!(
            McpError::ResourceNotFound("anki://x".into()).to_rpc_error().code,
            error_codes::INVALID_PARAMS
        );
    }
}
