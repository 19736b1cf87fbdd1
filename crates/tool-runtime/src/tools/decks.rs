//! Deck tools: `list_decks`, `create_deck`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::args::required_str;
use super::AnkiState;
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

/// List every deck in the collection.
pub struct ListDecksTool {
    state: AnkiState,
}

impl ListDecksTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for ListDecksTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_decks".to_string(),
            description: "List all available Anki decks.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    async fn execute(&self, _input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let decks = self.state.client.deck_names().await?;
        debug!(count = decks.len(), "listed decks");
        Ok(ToolResult::json(&json!({
            "decks": decks,
            "count": decks.len(),
        })))
    }
}

/// Create a deck, including nested `Parent::Child` decks.
pub struct CreateDeckTool {
    state: AnkiState,
}

impl CreateDeckTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

fn validate_deck_name(name: &str) -> Result<(), ToolError> {
    if name.split("::").any(|part| part.trim().is_empty()) {
        return Err(ToolError::InvalidInput(format!(
            "invalid deck name '{name}': every '::' level needs a name"
        )));
    }
    Ok(())
}

#[async_trait]
impl Tool for CreateDeckTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_deck".to_string(),
            description: "Create a new Anki deck. Use 'Parent::Child' for nested decks.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the deck to create"
                    }
                },
                "required": ["name"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let name = required_str(&input, "name")?.trim();
        validate_deck_name(name)?;

        let deck_id = self.state.client.create_deck(name).await?;
        info!(deck = %name, deck_id, "created deck");
        Ok(ToolResult::json(&json!({
            "deckId": deck_id,
            "name": name,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ctx, parse, state};

    #[tokio::test]
    async fn test_list_decks() {
        let (state, transport) = state();
        transport.always_ok("deckNames", json!(["Default", "Spanish::Verbs"]));

        let result = ListDecksTool::new(state).execute(json!({}), &ctx()).await.unwrap();
        let out = parse(&result);
        assert_eq!(out["count"], 2);
        assert_eq!(out["decks"][1], "Spanish::Verbs");
    }

    #[tokio::test]
    async fn test_create_deck() {
        let (state, transport) = state();
        transport.always_ok("createDeck", json!(1519323742721u64));

        let result = CreateDeckTool::new(state)
            .execute(json!({"name": " Spanish::Verbs "}), &ctx())
            .await
            .unwrap();
        let out = parse(&result);
        assert_eq!(out["deckId"], 1519323742721u64);
        assert_eq!(out["name"], "Spanish::Verbs");
        assert_eq!(transport.requests()[0].params, json!({"deck": "Spanish::Verbs"}));
    }

    #[tokio::test]
    async fn test_create_deck_rejects_empty_level() {
        let (state, transport) = state();
        let err = CreateDeckTool::new(state)
            .execute(json!({"name": "Spanish::"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_anki_is_unavailable() {
        let (state, transport) = state();
        transport.always(
            "deckNames",
            Err(ankimcp_anki::TransportError::connect("connection refused")),
        );
        let err = ListDecksTool::new(state).execute(json!({}), &ctx()).await.unwrap_err();
        assert!(matches!(err, ToolError::Unavailable(msg) if msg.contains("Anki is running")));
    }
}
