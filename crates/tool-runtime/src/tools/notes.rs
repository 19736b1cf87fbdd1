//! Note tools: create (single and batch), search, inspect, update, delete.

use ankimcp_anki::{ModelSchema, NewNote, NoteInfo, NoteOptions};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::args::{
    field_map, optional_bool, optional_str, optional_u64, required_id, required_str, string_list,
};
use super::{note_to_json, AnkiState};
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

const MAX_BATCH: usize = 100;
const DEFAULT_SEARCH_LIMIT: u64 = 50;
const MAX_SEARCH_LIMIT: u64 = 1_000;

/// Map supplied field names onto the note type's fields.
///
/// Names match exactly first, then case-insensitively. The result lists
/// every field of the note type in order, missing ones empty. The first
/// field must be non-empty, as Anki requires.
pub(crate) fn normalize_fields(
    schema: &ModelSchema,
    supplied: &IndexMap<String, String>,
) -> Result<IndexMap<String, String>, ToolError> {
    let mut normalized: IndexMap<String, String> = schema
        .fields
        .iter()
        .map(|f| (f.clone(), String::new()))
        .collect();
    let mut assigned: Vec<&str> = Vec::new();

    for (name, value) in supplied {
        let target = schema
            .fields
            .iter()
            .find(|f| *f == name)
            .or_else(|| schema.fields.iter().find(|f| f.eq_ignore_ascii_case(name)))
            .ok_or_else(|| {
                ToolError::InvalidInput(format!(
                    "Unknown field '{name}' for note type '{}'. Valid fields: {}",
                    schema.name,
                    schema.fields.join(", ")
                ))
            })?;
        if assigned.contains(&target.as_str()) {
            return Err(ToolError::InvalidInput(format!(
                "Field '{target}' was supplied more than once"
            )));
        }
        assigned.push(target);
        normalized.insert(target.clone(), value.clone());
    }

    if let Some(first) = schema.fields.first() {
        let empty = normalized.get(first).map_or(true, |v| v.trim().is_empty());
        if empty {
            return Err(ToolError::InvalidInput(format!(
                "Field '{first}' is required and cannot be empty"
            )));
        }
    }
    Ok(normalized)
}

/// Validate one note description against the collection and build a [`NewNote`].
async fn prepare_note(
    state: &AnkiState,
    context: &ToolContext,
    decks: &[String],
    input: &Value,
) -> Result<NewNote, ToolError> {
    let model_name = required_str(input, "type")?;
    let deck = optional_str(input, "deck")?.unwrap_or(&context.default_deck);
    let supplied = field_map(input, "fields")?;
    let tags = string_list(input, "tags")?;
    let allow_duplicate = optional_bool(input, "allowDuplicate")?.unwrap_or(false);

    if !decks.iter().any(|d| d == deck) {
        return Err(ToolError::InvalidInput(format!(
            "Deck not found: {deck}. Create it first with create_deck."
        )));
    }

    let schema = state.cache.get_schema(model_name).await?;
    let fields = normalize_fields(&schema, &supplied)?;

    Ok(NewNote {
        deck_name: deck.to_string(),
        model_name: schema.name,
        fields,
        tags,
        options: NoteOptions { allow_duplicate },
    })
}

fn note_properties() -> Value {
    json!({
        "type": {
            "type": "string",
            "description": "Note type (e.g. 'Basic')"
        },
        "deck": {
            "type": "string",
            "description": "Deck name (defaults to the configured default deck)"
        },
        "fields": {
            "type": "object",
            "description": "Field values keyed by field name; names are matched case-insensitively",
            "additionalProperties": {"type": "string"}
        },
        "tags": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Tags to attach"
        },
        "allowDuplicate": {
            "type": "boolean",
            "description": "Allow a note whose first field duplicates an existing one"
        }
    })
}

// ── create_note ─────────────────────────────────────────────────────

pub struct CreateNoteTool {
    state: AnkiState,
}

impl CreateNoteTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for CreateNoteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_note".to_string(),
            description: "Create a new note. Use get_note_type_info to see a note type's fields."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": note_properties(),
                "required": ["type", "fields"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let decks = self.state.client.deck_names().await?;
        let note = prepare_note(&self.state, context, &decks, &input).await?;

        let note_id = self.state.client.add_note(&note).await?.ok_or_else(|| {
            ToolError::ExecutionFailed(
                "Anki did not create the note (it may be a duplicate)".to_string(),
            )
        })?;
        info!(note_id, deck = %note.deck_name, model = %note.model_name, "created note");

        Ok(ToolResult::json(&json!({
            "noteId": note_id,
            "deck": note.deck_name,
            "modelName": note.model_name,
        })))
    }
}

// ── batch_create_notes ──────────────────────────────────────────────

pub struct BatchCreateNotesTool {
    state: AnkiState,
}

impl BatchCreateNotesTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for BatchCreateNotesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "batch_create_notes".to_string(),
            description: format!(
                "Create up to {MAX_BATCH} notes at once. Each note is validated separately."
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "notes": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": note_properties(),
                            "required": ["type", "fields"]
                        },
                        "maxItems": MAX_BATCH
                    },
                    "stopOnError": {
                        "type": "boolean",
                        "description": "Abort the whole batch on the first invalid note (default: false)"
                    }
                },
                "required": ["notes"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let items = match input.get("notes") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ToolError::InvalidInput("'notes' must be an array".to_string())),
            None => return Err(ToolError::InvalidInput("missing 'notes' field".to_string())),
        };
        if items.is_empty() || items.len() > MAX_BATCH {
            return Err(ToolError::InvalidInput(format!(
                "'notes' must contain between 1 and {MAX_BATCH} notes"
            )));
        }
        let stop_on_error = optional_bool(&input, "stopOnError")?.unwrap_or(false);

        let decks = self.state.client.deck_names().await?;
        let mut results: Vec<Option<Value>> = vec![None; items.len()];
        let mut pending: Vec<(usize, NewNote)> = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match prepare_note(&self.state, context, &decks, item).await {
                Ok(note) => pending.push((index, note)),
                Err(ToolError::InvalidInput(msg)) if !stop_on_error => {
                    results[index] = Some(json!({"index": index, "success": false, "error": msg}));
                }
                Err(ToolError::InvalidInput(msg)) => {
                    return Err(ToolError::InvalidInput(format!("note {index}: {msg}")));
                }
                Err(other) => return Err(other),
            }
        }

        if !pending.is_empty() {
            let notes: Vec<NewNote> = pending.iter().map(|(_, n)| n.clone()).collect();
            let ids = self.state.client.add_notes(&notes).await?;
            for ((index, _), id) in pending.iter().zip(ids.into_iter().chain(std::iter::repeat(None))) {
                results[*index] = Some(match id {
                    Some(note_id) => json!({"index": index, "success": true, "noteId": note_id}),
                    None => json!({
                        "index": index,
                        "success": false,
                        "error": "Anki did not create the note (it may be a duplicate)"
                    }),
                });
            }
        }

        let results: Vec<Value> = results.into_iter().flatten().collect();
        let created = results.iter().filter(|r| r["success"] == true).count();
        info!(total = items.len(), created, "batch created notes");

        Ok(ToolResult::json(&json!({
            "total": items.len(),
            "created": created,
            "failed": items.len() - created,
            "results": results,
        })))
    }
}

// ── search_notes ────────────────────────────────────────────────────

pub struct SearchNotesTool {
    state: AnkiState,
}

impl SearchNotesTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for SearchNotesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_notes".to_string(),
            description: "Search notes with Anki query syntax (e.g. 'deck:Spanish tag:verb')."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Anki search query"
                    },
                    "limit": {
                        "type": "integer",
                        "description": format!("Maximum notes to return (default {DEFAULT_SEARCH_LIMIT}, max {MAX_SEARCH_LIMIT})")
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = required_str(&input, "query")?;
        let limit = optional_u64(&input, "limit")?
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT) as usize;

        let ids = self.state.client.find_notes(query).await?;
        let shown = &ids[..ids.len().min(limit)];
        let notes: Vec<NoteInfo> = if shown.is_empty() {
            Vec::new()
        } else {
            self.state.client.notes_info(shown).await?
        };
        debug!(query = %query, total = ids.len(), returned = notes.len(), "searched notes");

        Ok(ToolResult::json(&json!({
            "query": query,
            "total": ids.len(),
            "returned": notes.len(),
            "notes": notes.iter().map(note_to_json).collect::<Vec<_>>(),
        })))
    }
}

// ── get_note_info ───────────────────────────────────────────────────

pub struct GetNoteInfoTool {
    state: AnkiState,
}

impl GetNoteInfoTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

async fn fetch_note(state: &AnkiState, id: u64) -> Result<NoteInfo, ToolError> {
    state
        .client
        .notes_info(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::InvalidInput(format!("Note not found: {id}")))
}

#[async_trait]
impl Tool for GetNoteInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_note_info".to_string(),
            description: "Get the fields, tags and cards of a note.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "noteId": {
                        "type": "integer",
                        "description": "Note ID"
                    }
                },
                "required": ["noteId"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let id = required_id(&input, "noteId")?;
        let note = fetch_note(&self.state, id).await?;

        let mut out = note_to_json(&note);
        out["cards"] = json!(note.cards);
        Ok(ToolResult::json(&out))
    }
}

// ── update_note ─────────────────────────────────────────────────────

pub struct UpdateNoteTool {
    state: AnkiState,
}

impl UpdateNoteTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for UpdateNoteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "update_note".to_string(),
            description: "Update field values of an existing note. Unlisted fields are left unchanged."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "integer",
                        "description": "Note ID"
                    },
                    "fields": {
                        "type": "object",
                        "description": "Field values to set, keyed by field name",
                        "additionalProperties": {"type": "string"}
                    }
                },
                "required": ["id", "fields"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let id = required_id(&input, "id")?;
        let supplied = field_map(&input, "fields")?;
        if supplied.is_empty() {
            return Err(ToolError::InvalidInput("'fields' must not be empty".to_string()));
        }

        let note = fetch_note(&self.state, id).await?;
        let mut fields = IndexMap::with_capacity(supplied.len());
        for (name, value) in supplied {
            let canonical = note
                .fields
                .keys()
                .find(|k| **k == name)
                .or_else(|| note.fields.keys().find(|k| k.eq_ignore_ascii_case(&name)))
                .ok_or_else(|| {
                    ToolError::InvalidInput(format!(
                        "Unknown field '{name}' for note type '{}'",
                        note.model_name
                    ))
                })?;
            if fields.contains_key(canonical) {
                return Err(ToolError::InvalidInput(format!(
                    "Field '{canonical}' was supplied more than once"
                )));
            }
            fields.insert(canonical.clone(), value);
        }

        self.state.client.update_note_fields(id, &fields).await?;
        info!(note_id = id, count = fields.len(), "updated note");

        Ok(ToolResult::json(&json!({
            "success": true,
            "noteId": id,
            "updatedFields": fields.keys().collect::<Vec<_>>(),
        })))
    }
}

// ── delete_note ─────────────────────────────────────────────────────

pub struct DeleteNoteTool {
    state: AnkiState,
}

impl DeleteNoteTool {
    pub fn new(state: AnkiState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Tool for DeleteNoteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "delete_note".to_string(),
            description: "Delete a note and all of its cards.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "noteId": {
                        "type": "integer",
                        "description": "Note ID"
                    }
                },
                "required": ["noteId"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let id = required_id(&input, "noteId")?;
        self.state.client.delete_notes(&[id]).await?;
        info!(note_id = id, "deleted note");
        Ok(ToolResult::json(&json!({"success": true, "noteId": id})))
    }
}
