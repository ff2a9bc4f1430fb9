use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::error::RegistryError;
use super::interface::Tool;
use super::schema::ParameterSchema;

/// Immutable description of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameter_schema: ParameterSchema,
}

impl ToolDefinition {
    /// Function-calling payload in the shape most providers accept.
    pub fn to_function_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameter_schema.to_json(),
            }
        })
    }
}

/// Lookup table of tools, filled once at startup and then shared read-only.
#[derive(Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName { name });
        }
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }

        let definition = ToolDefinition {
            name: name.clone(),
            description: tool.description().to_string(),
            parameter_schema: tool.parameter_schema(),
        };
        debug!(tool = %name, "Registered tool");
        self.index.insert(name, self.tools.len());
        self.definitions.push(definition);
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        self.index
            .get(name)
            .map(|&position| self.tools[position].clone())
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&position| &self.definitions[position])
    }

    /// Definitions in registration order.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|definition| definition.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
