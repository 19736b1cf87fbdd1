//! Anki tools exposed over MCP.
//!
//! Every tool validates and normalizes its JSON arguments, then calls the
//! [`AnkiClient`] or the [`SchemaCache`].

pub mod args;
pub mod decks;
pub mod note_types;
pub mod notes;

use std::sync::Arc;

use ankimcp_anki::{AnkiClient, NoteInfo, SchemaCache};
use serde_json::{json, Map, Value};

use crate::registry::{RegistryError, ToolRegistry};

pub use decks::{CreateDeckTool, ListDecksTool};
pub use note_types::{CreateNoteTypeTool, GetNoteTypeInfoTool, ListNoteTypesTool};
pub use notes::{
    BatchCreateNotesTool, CreateNoteTool, DeleteNoteTool, GetNoteInfoTool, SearchNotesTool,
    UpdateNoteTool,
};

/// Shared handles every Anki tool holds.
#[derive(Clone)]
pub struct AnkiState {
    pub client: Arc<AnkiClient>,
    pub cache: Arc<SchemaCache>,
}

impl AnkiState {
    pub fn new(client: Arc<AnkiClient>, cache: Arc<SchemaCache>) -> Self {
        Self { client, cache }
    }
}

/// Register all eleven Anki tools.
pub fn register_anki_tools(registry: &mut ToolRegistry, state: AnkiState) -> Result<(), RegistryError> {
    registry.register(ListDecksTool::new(state.clone()))?;
    registry.register(CreateDeckTool::new(state.clone()))?;
    registry.register(ListNoteTypesTool::new(state.clone()))?;
    registry.register(CreateNoteTypeTool::new(state.clone()))?;
    registry.register(GetNoteTypeInfoTool::new(state.clone()))?;
    registry.register(CreateNoteTool::new(state.clone()))?;
    registry.register(BatchCreateNotesTool::new(state.clone()))?;
    registry.register(SearchNotesTool::new(state.clone()))?;
    registry.register(GetNoteInfoTool::new(state.clone()))?;
    registry.register(UpdateNoteTool::new(state.clone()))?;
    registry.register(DeleteNoteTool::new(state))?;
    Ok(())
}

/// Flatten a note into `{noteId, modelName, tags, fields: {name: value}}`,
/// fields in note-type order.
pub(crate) fn note_to_json(note: &NoteInfo) -> Value {
    let mut ordered: Vec<_> = note.fields.iter().collect();
    ordered.sort_by_key(|(_, field)| field.order);

    let mut fields = Map::new();
    for (name, field) in ordered {
        fields.insert(name.clone(), Value::String(field.value.clone()));
    }

    json!({
        "noteId": note.note_id,
        "modelName": note.model_name,
        "tags": note.tags,
        "fields": fields,
    })
}
