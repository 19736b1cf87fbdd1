use crate::tool::{Tool, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Manages available tools, their schemas, and lookup by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Returns error if name already registered.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let def = tool.definition();
        if self.tools.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        self.tools.insert(def.name, Arc::new(tool));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All registered tool definitions, sorted by name.
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool with name '{0}' is already registered")]
    DuplicateName(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::state;
    use crate::tools::{ListDecksTool, ListNoteTypesTool};

    #[test]
    fn test_register_and_lookup() {
        let (state, _) = state();
        let mut registry = ToolRegistry::new();
        registry.register(ListDecksTool::new(state)).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("list_decks").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let (state, _) = state();
        let mut registry = ToolRegistry::new();
        registry.register(ListDecksTool::new(state.clone())).unwrap();
        assert!(matches!(
            registry.register(ListDecksTool::new(state)),
            Err(RegistryError::DuplicateName(name)) if name == "list_decks"
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        let (state, _) = state();
        let mut registry = ToolRegistry::new();
        registry.register(ListNoteTypesTool::new(state.clone())).unwrap();
        registry.register(ListDecksTool::new(state)).unwrap();

        let names: Vec<_> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["list_decks", "list_note_types"]);
    }
}
