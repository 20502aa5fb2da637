//! Registry of named tools available to agent definitions.

use crate::tools::base::Tool;
use crate::tools::builtin;
use std::collections::HashMap;
use std::sync::Arc;
use tk_protocol::tool_models::ToolSchema;

/// Maps tool names to implementations.
///
/// Agent definitions reference tools by name; the factory resolves those
/// names here.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the demo tools.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for tool in builtin::all() {
            registry.register(tool);
        }
        registry
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Schemas of all registered tools, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.schema().clone())
            .collect()
    }
}
