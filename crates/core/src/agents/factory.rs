//! Agent factory for creating agents from their definitions.

use crate::agents::base::Agent;
use crate::gateway::ModelGateway;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use thiserror::Error;
use tk_protocol::agent_models::AgentDefinition;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("Agent '{agent}' declares unknown tool '{tool}'")]
    UnknownTool { agent: String, tool: String },
    #[error("Agent definition has an empty name")]
    EmptyName,
}

/// Builds [`Agent`]s from `.team-kit/agents/*.md` definitions.
pub struct AgentFactory;

impl AgentFactory {
    /// Create an agent from its definition.
    ///
    /// Every tool named in the definition must be present in `tools`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use tk_core::agents::AgentFactory;
    /// use tk_core::gateway::ScriptedGateway;
    /// use tk_core::tools::ToolRegistry;
    /// use tk_protocol::agent_models::AgentDefinition;
    ///
    /// let definition = AgentDefinition {
    ///     name: "calculator".to_string(),
    ///     description: "Adds numbers".to_string(),
    ///     model: "gpt-4o".to_string(),
    ///     handoffs: vec![],
    ///     tools: vec!["add".to_string()],
    ///     color: "blue".to_string(),
    ///     instruction: "Use the add tool.".to_string(),
    /// };
    ///
    /// let agent = AgentFactory::create(
    ///     &definition,
    ///     Arc::new(ScriptedGateway::new()),
    ///     &ToolRegistry::builtin(),
    /// )
    /// .unwrap();
    /// assert!(agent.tool("add").is_some());
    /// ```
    pub fn create(
        definition: &AgentDefinition,
        gateway: Arc<dyn ModelGateway>,
        tools: &ToolRegistry,
    ) -> Result<Agent, FactoryError> {
        if definition.name.trim().is_empty() {
            return Err(FactoryError::EmptyName);
        }

        let mut agent = Agent::new(definition.name.clone(), gateway)
            .with_description(definition.description.clone())
            .with_model(definition.model.clone())
            .with_instruction(definition.instruction.clone());

        for tool_name in &definition.tools {
            let tool = tools.get(tool_name).ok_or_else(|| FactoryError::UnknownTool {
                agent: definition.name.clone(),
                tool: tool_name.clone(),
            })?;
            agent = agent.with_tool(tool);
        }

        for target in &definition.handoffs {
            agent = agent.with_handoff(target);
        }

        Ok(agent)
    }
}
