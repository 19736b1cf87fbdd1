use ankimcp_anki::AnkiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes a tool's interface for MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "create_note", "search_notes")
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// JSON Schema describing the expected input
    pub input_schema: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Result content (pretty-printed JSON for the Anki tools)
    pub content: String,
    /// Whether this result represents an error
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn json(value: &Value) -> Self {
        let content = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self::text(content)
    }
}

/// Per-call context handed to every tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Deck used when a note is created without an explicit deck
    pub default_deck: String,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            default_deck: "Default".to_string(),
        }
    }
}

/// The primary extension point: all tools implement this trait.
///
/// Tools are object-safe, Send + Sync, and async.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition (name, description, JSON Schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments are malformed or reference something that does not exist.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Anki could not be reached (not running, or not responding).
    #[error("{0}")]
    Unavailable(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<AnkiError> for ToolError {
    fn from(err: AnkiError) -> Self {
        match err {
            AnkiError::Validation(msg) => ToolError::InvalidInput(msg),
            AnkiError::Connection(msg) | AnkiError::Timeout(msg) => ToolError::Unavailable(msg),
            AnkiError::Api { message, .. } => ToolError::ExecutionFailed(message),
            AnkiError::Other(msg) => ToolError::ExecutionFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_json_is_pretty() {
        let result = ToolResult::json(&serde_json::json!({"count": 1}));
        assert!(!result.is_error);
        assert!(result.content.contains("\n"));
        let parsed: Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(parsed["count"], 1);
    }

    #[test]
    fn test_anki_error_mapping() {
        assert!(matches!(
            ToolError::from(AnkiError::validation("Note type not found: X")),
            ToolError::InvalidInput(_)
        ));
        assert!(matches!(
            ToolError::from(AnkiError::Timeout("slow".to_string())),
            ToolError::Unavailable(_)
        ));
        let err = ToolError::from(AnkiError::api("deck was not found"));
        assert_eq!(err.to_string(), "Execution failed: deck was not found");
    }
}
