//! Note-type tools: `list_note_types`, `get_note_type_info`, `create_note_type`.

use std::collections::HashSet;

use ankimcp_anki::{NewCardTemplate, NewModel};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::args::{optional_bool, optional_str, required_str, string_list};
use super::AnkiState;
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

const DEFAULT_CSS: &str = ".card {\n  font-family: arial;\n  font-size: 20px;\n  text-align: center;\n  color: black;\n  background-color: white;\n}\n";

pub struct ListNoteTypesTool {
    state: AnkiState,
}

impl ListNoteTypesTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for ListNoteTypesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_note_types".to_string(),
            description: "List all available note types (models).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    async fn execute(&self, _input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let names = self.state.client.model_names().await?;
        Ok(ToolResult::json(&json!({
            "noteTypes": names,
            "count": names.len(),
        })))
    }
}

/// Describe one note type: fields, card templates and optionally CSS.
pub struct GetNoteTypeInfoTool {
    state: AnkiState,
}

impl GetNoteTypeInfoTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for GetNoteTypeInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_note_type_info".to_string(),
            description: "Get the fields, card templates and styling of a note type.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "modelName": {
                        "type": "string",
                        "description": "Name of the note type"
                    },
                    "includeCss": {
                        "type": "boolean",
                        "description": "Whether to include the CSS (default: true)"
                    }
                },
                "required": ["modelName"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let model_name = required_str(&input, "modelName")?;
        let include_css = optional_bool(&input, "includeCss")?.unwrap_or(true);

        let schema = self.state.cache.get_schema(model_name).await?;
        let mut out = json!({
            "modelName": schema.name,
            "fields": schema.fields,
            "templates": schema.templates,
        });
        if include_css {
            out["css"] = Value::String(schema.css);
        }
        Ok(ToolResult::json(&out))
    }
}

/// Create a note type from fields, card templates and CSS.
pub struct CreateNoteTypeTool {
    state: AnkiState,
}

impl CreateNoteTypeTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

fn parse_templates(input: &Value) -> Result<Vec<NewCardTemplate>, ToolError> {
    let items = match input.get("templates") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        Some(Value::Array(_)) => {
            return Err(ToolError::InvalidInput(
                "at least one card template is required".to_string(),
            ))
        }
        Some(_) => {
            return Err(ToolError::InvalidInput("'templates' must be an array".to_string()))
        }
        None => return Err(ToolError::InvalidInput("missing 'templates' field".to_string())),
    };

    let mut seen = HashSet::new();
    let mut templates = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let name = required_str(item, "name")
            .map_err(|e| ToolError::InvalidInput(format!("template {i}: {e}")))?;
        let front = required_str(item, "front")
            .map_err(|e| ToolError::InvalidInput(format!("template {i}: {e}")))?;
        let back = required_str(item, "back")
            .map_err(|e| ToolError::InvalidInput(format!("template {i}: {e}")))?;
        if !seen.insert(name.to_lowercase()) {
            return Err(ToolError::InvalidInput(format!("duplicate template name '{name}'")));
        }
        templates.push(NewCardTemplate {
            name: name.to_string(),
            front: front.to_string(),
            back: back.to_string(),
        });
    }
    Ok(templates)
}

#[async_trait]
impl Tool for CreateNoteTypeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_note_type".to_string(),
            description: "Create a new note type with the given fields and card templates."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the new note type"
                    },
                    "fields": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Field names, in order"
                    },
                    "css": {
                        "type": "string",
                        "description": "CSS styling for the cards"
                    },
                    "isCloze": {
                        "type": "boolean",
                        "description": "Create a cloze note type (default: false)"
                    },
                    "templates": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "front": {"type": "string"},
                                "back": {"type": "string"}
                            },
                            "required": ["name", "front", "back"]
                        },
                        "description": "Card templates"
                    }
                },
                "required": ["name", "fields", "templates"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let name = required_str(&input, "name")?.trim();
        let fields = string_list(&input, "fields")?;
        if fields.is_empty() {
            return Err(ToolError::InvalidInput("at least one field is required".to_string()));
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if field.trim().is_empty() {
                return Err(ToolError::InvalidInput("field names must not be empty".to_string()));
            }
            if !seen.insert(field.to_lowercase()) {
                return Err(ToolError::InvalidInput(format!("duplicate field name '{field}'")));
            }
        }
        let templates = parse_templates(&input)?;
        let css = optional_str(&input, "css")?.unwrap_or(DEFAULT_CSS).to_string();
        let is_cloze = optional_bool(&input, "isCloze")?.unwrap_or(false);

        let existing = self.state.client.model_names().await?;
        if existing.iter().any(|m| m == name) {
            return Err(ToolError::InvalidInput(format!("Note type already exists: {name}")));
        }

        let model = NewModel {
            name: name.to_string(),
            fields,
            css,
            is_cloze,
            templates,
        };
        self.state.client.create_model(&model).await?;
        self.state.cache.clear().await;
        info!(model = %name, "created note type");

        let template_names: Vec<_> = model.templates.iter().map(|t| t.name.as_str()).collect();
        Ok(ToolResult::json(&json!({
            "success": true,
            "modelName": model.name,
            "fields": model.fields,
            "templates": template_names,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ctx, parse, script_collection, state};

    #[tokio::test]
    async fn test_list_note_types() {
        let (state, transport) = state();
        script_collection(&transport);

        let out = parse(&ListNoteTypesTool::new(state).execute(json!({}), &ctx()).await.unwrap());
        assert_eq!(out["noteTypes"], json!(["Basic", "Cloze"]));
        assert_eq!(out["count"], 2);
    }

    #[tokio::test]
    async fn test_get_note_type_info_uses_cache() {
        let (state, transport) = state();
        script_collection(&transport);
        let tool = GetNoteTypeInfoTool::new(state);

        let out = parse(&tool.execute(json!({"modelName": "Basic"}), &ctx()).await.unwrap());
        assert_eq!(out["fields"], json!(["Front", "Back"]));
        assert_eq!(out["templates"]["Card 1"]["front"], "{{Front}}");
        assert_eq!(out["css"], ".card {}");

        let out = parse(
            &tool
                .execute(json!({"modelName": "Basic", "includeCss": false}), &ctx())
                .await
                .unwrap(),
        );
        assert!(out.get("css").is_none());
        assert_eq!(transport.call_count("modelFieldNames"), 1);
    }

    #[tokio::test]
    async fn test_get_note_type_info_unknown() {
        let (state, transport) = state();
        script_collection(&transport);

        let err = GetNoteTypeInfoTool::new(state)
            .execute(json!({"modelName": "Vocab"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(msg) if msg.contains("Vocab")));
    }

    fn vocab_input() -> Value {
        json!({
            "name": "Vocab",
            "fields": ["Word", "Meaning"],
            "templates": [{"name": "Recognition", "front": "{{Word}}", "back": "{{Meaning}}"}]
        })
    }

    #[tokio::test]
    async fn test_create_note_type_clears_cache() {
        let (state, transport) = state();
        script_collection(&transport);
        transport.always_ok("createModel", json!({"id": 1}));

        // Warm the cache, then create a model.
        state.cache.get_schema("Basic").await.unwrap();
        let out = parse(
            &CreateNoteTypeTool::new(state.clone())
                .execute(vocab_input(), &ctx())
                .await
                .unwrap(),
        );
        assert_eq!(out["modelName"], "Vocab");
        assert_eq!(out["templates"], json!(["Recognition"]));

        let create = transport
            .requests()
            .into_iter()
            .find(|r| r.action == "createModel")
            .unwrap();
        assert_eq!(create.params["inOrderFields"], json!(["Word", "Meaning"]));
        assert_eq!(create.params["css"], DEFAULT_CSS);

        state.cache.get_schema("Basic").await.unwrap();
        assert_eq!(transport.call_count("modelFieldNames"), 2);
    }

    #[tokio::test]
    async fn test_create_note_type_rejects_existing() {
        let (state, transport) = state();
        script_collection(&transport);
        let mut input = vocab_input();
        input["name"] = json!("Basic");

        let err = CreateNoteTypeTool::new(state).execute(input, &ctx()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(msg) if msg.contains("already exists")));
        assert_eq!(transport.call_count("createModel"), 0);
    }

    #[tokio::test]
    async fn test_create_note_type_validates_shape() {
        let (state, transport) = state();
        let tool = CreateNoteTypeTool::new(state);

        let mut no_fields = vocab_input();
        no_fields["fields"] = json!([]);
        assert!(tool.execute(no_fields, &ctx()).await.is_err());

        let mut dup_fields = vocab_input();
        dup_fields["fields"] = json!(["Word", "word"]);
        assert!(tool.execute(dup_fields, &ctx()).await.is_err());

        let mut no_templates = vocab_input();
        no_templates["templates"] = json!([]);
        assert!(tool.execute(no_templates, &ctx()).await.is_err());

        let mut bad_template = vocab_input();
        bad_template["templates"] = json!([{"name": "Card 1", "front": "{{Word}}"}]);
        let err = tool.execute(bad_template, &ctx()).await.unwrap_err();
        assert!(err.to_string().contains("template 0"));

        assert_eq!(transport.total_calls(), 0);
    }
}
