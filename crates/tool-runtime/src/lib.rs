//! Tool abstraction, registry and the Anki tool set.

pub mod registry;
pub mod tool;
pub mod tools;

pub use registry::{RegistryError, ToolRegistry};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};
pub use tools::{register_anki_tools, AnkiState};
