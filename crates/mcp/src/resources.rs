//! Read-only `anki://` resources: deck list, note-type names and schemas.

use percent_encoding::percent_decode_str;
use serde_json::{json, Value};

use ankimcp_tool_runtime::AnkiState;

use crate::error::McpError;
use crate::types::{ReadResourceResult, Resource, ResourceContents, ResourceTemplate};

const JSON_MIME: &str = "application/json";
const DECKS_URI: &str = "anki://decks/all";
const NOTE_TYPES_URI: &str = "anki://note-types/all";
const ALL_SCHEMAS_URI: &str = "anki://note-types/all-with-schemas";
const NOTE_TYPE_PREFIX: &str = "anki://note-types/";

/// A parsed resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnkiResource {
    Decks,
    NoteTypes,
    AllSchemas,
    NoteType(String),
}

impl AnkiResource {
    pub fn parse(uri: &str) -> Result<Self, McpError> {
        match uri {
            DECKS_URI => Ok(Self::Decks),
            NOTE_TYPES_URI => Ok(Self::NoteTypes),
            ALL_SCHEMAS_URI => Ok(Self::AllSchemas),
            _ => {
                let encoded = uri
                    .strip_prefix(NOTE_TYPE_PREFIX)
                    .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                    .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))?;
                let name = percent_decode_str(encoded)
                    .decode_utf8()
                    .map_err(|_| McpError::InvalidParams(format!("invalid UTF-8 in {uri}")))?;
                Ok(Self::NoteType(name.into_owned()))
            }
        }
    }
}

/// Serves the `anki://` resources from the client and the schema cache.
pub struct ResourceProvider {
    anki: AnkiState,
}

impl ResourceProvider {
    pub fn new(anki: AnkiState) -> Self {
        Self { anki }
    }

    pub fn list(&self) -> Vec<Resource> {
        [
            (DECKS_URI, "All decks", "Names of every deck in the collection"),
            (NOTE_TYPES_URI, "All note types", "Names of every note type"),
            (
                ALL_SCHEMAS_URI,
                "All note type schemas",
                "Fields, card templates and CSS of every note type",
            ),
        ]
        .into_iter()
        .map(|(uri, name, description)| Resource {
            uri: uri.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        })
        .collect()
    }

    pub fn templates(&self) -> Vec<ResourceTemplate> {
        vec![ResourceTemplate {
            uri_template: format!("{NOTE_TYPE_PREFIX}{{modelName}}"),
            name: "Note type schema".to_string(),
            description: Some("Fields, card templates and CSS of one note type".to_string()),
            mime_type: Some(JSON_MIME.to_string()),
        }]
    }

    /// Read an already-parsed resource.
    pub async fn read(&self, uri: &str, resource: AnkiResource) -> Result<ReadResourceResult, McpError> {
        let value: Value = match resource {
            AnkiResource::Decks => {
                let decks = self.anki.client.deck_names().await?;
                json!({"decks": decks, "count": decks.len()})
            }
            AnkiResource::NoteTypes => {
                let names = self.anki.client.model_names().await?;
                json!({"noteTypes": names, "count": names.len()})
            }
            AnkiResource::AllSchemas => {
                let schemas = self.anki.cache.get_all_schemas().await?;
                json!({"noteTypes": schemas, "count": schemas.len()})
            }
            AnkiResource::NoteType(name) => {
                let schema = self.anki.cache.get_schema(&name).await?;
                serde_json::to_value(schema)?
            }
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some(JSON_MIME.to_string()),
                text: serde_json::to_string_pretty(&value)?,
            }],
        })
    }
}
