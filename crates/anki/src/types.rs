//! AnkiConnect wire types and the data model shared with callers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

// ── Wire envelope ───────────────────────────────────────────────────

/// Body of one AnkiConnect request: `{action, version, params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub version: u32,
    pub params: Value,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, version: u32, params: Value) -> Self {
        Self {
            action: action.into(),
            version,
            params,
        }
    }
}

/// Body of one AnkiConnect response: `{result, error}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionResponse {
    /// A non-null `error` wins; otherwise the result (possibly `null`).
    pub fn into_result(self) -> Result<Value, TransportError> {
        match self.error {
            Some(message) => Err(TransportError::remote(message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ── Notes ───────────────────────────────────────────────────────────

/// A note to be created through `addNote` / `addNotes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub deck_name: String,
    pub model_name: String,
    pub fields: IndexMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub options: NoteOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    #[serde(default)]
    pub allow_duplicate: bool,
}

/// One field of an existing note as reported by `notesInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteField {
    pub value: String,
    pub order: u32,
}

/// An existing note as reported by `notesInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    pub note_id: u64,
    pub model_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub fields: IndexMap<String, NoteField>,
    #[serde(default)]
    pub cards: Vec<u64>,
}

// ── Note types ──────────────────────────────────────────────────────

/// Front/back markup of one card template.
///
/// AnkiConnect reports `Front`/`Back`; it is re-serialized in lower case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    #[serde(rename(deserialize = "Front"), alias = "front")]
    pub front: String,
    #[serde(rename(deserialize = "Back"), alias = "back")]
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStyling {
    pub css: String,
}

/// A card template supplied when creating a note type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCardTemplate {
    pub name: String,
    pub front: String,
    pub back: String,
}

/// A note type to be created through `createModel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModel {
    pub name: String,
    pub fields: Vec<String>,
    pub css: String,
    pub is_cloze: bool,
    pub templates: Vec<NewCardTemplate>,
}

impl NewModel {
    pub(crate) fn to_params(&self) -> Value {
        let templates: Vec<Value> = self
            .templates
            .iter()
            .map(|t| {
                serde_json::json!({
                    "Name": t.name,
                    "Front": t.front,
                    "Back": t.back,
                })
            })
            .collect();
        serde_json::json!({
            "modelName": self.name,
            "inOrderFields": self.fields,
            "css": self.css,
            "isCloze": self.is_cloze,
            "cardTemplates": templates,
        })
    }
}

/// Snapshot of one note type's structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    /// Field names in note-type order.
    pub fields: Vec<String>,
    pub templates: IndexMap<String, CardTemplate>,
    pub css: String,
}
