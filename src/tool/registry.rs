// ABOUTME: Implements the ToolRegistry - a read-only table mapping tool names
// ABOUTME: to executors and schemas, built once and shared by Arc.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{Tool, ToolSchema};
use crate::error::{RegistryError, ValidationError};
use crate::oracle::ToolDefinition;

struct Entry {
    tool: Arc<dyn Tool>,
    schema: ToolSchema,
}

/// Registry of domain tools.
///
/// Populated at startup through `register`, then wrapped in an `Arc` and
/// shared read-only by every agent. There is no interior mutability.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Entry>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool from an Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        let schema = tool.schema();
        tracing::debug!(tool = %name, params = schema.params.len(), "registered tool");
        self.tools.insert(name, Entry { tool, schema });
        Ok(())
    }

    /// Builder form of `register` for chained construction.
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Result<Self, RegistryError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Look up the executor for a tool.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|e| Arc::clone(&e.tool))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name).map(|e| &e.schema)
    }

    /// Check `arguments` against the declared schema of `name`.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<Map<String, Value>, ValidationError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ValidationError::UnknownTool(name.to_string()))?;
        entry.schema.validate(name, arguments)
    }

    /// List all tool names, sorted alphabetically.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered tools.
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Oracle tool definitions for the given subset, skipping unknown names.
    pub fn definitions_for<'a, I>(&self, names: I) -> Vec<ToolDefinition>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                self.tools.get(name).map(|e| ToolDefinition {
                    name: name.to_string(),
                    description: e.tool.description().to_string(),
                    input_schema: e.schema.to_json_schema(),
                })
            })
            .collect()
    }
}
