//! Tool call execution.
//!
//! The executor resolves a tool call against the acting agent's own tools,
//! validates the arguments and runs the tool. Every outcome, including
//! failures, becomes a tool-role message so the agent can react to it.

use crate::agents::base::Agent;
use crate::tools::base::ToolError;
use serde_json::Value;
use tk_protocol::message_models::{Message, ToolCall};
use tracing::{debug, warn};

pub struct ToolExecutor;

impl ToolExecutor {
    /// Run `call` on behalf of `agent` and return the rendered result.
    ///
    /// # Errors
    ///
    /// - [`ToolError::UnknownTool`] if the agent does not declare the tool
    /// - [`ToolError::SchemaViolation`] if the arguments do not match its schema
    /// - [`ToolError::ExecutionFailure`] if the tool itself fails
    pub async fn try_execute(agent: &Agent, call: &ToolCall) -> Result<String, ToolError> {
        let tool = agent
            .tool(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        tool.schema()
            .validate(&call.arguments)
            .map_err(|reason| ToolError::SchemaViolation {
                tool: call.name.clone(),
                reason,
            })?;

        let value = tool
            .call(&call.arguments)
            .await
            .map_err(|e| ToolError::ExecutionFailure {
                tool: call.name.clone(),
                reason: format!("{e:#}"),
            })?;

        Ok(render(&value))
    }

    /// Run `call` and wrap the outcome in a tool-role message.
    ///
    /// Never fails: errors are logged and returned as a tool error message
    /// attributed to `agent`.
    pub async fn execute(agent: &Agent, call: &ToolCall) -> Message {
        match Self::try_execute(agent, call).await {
            Ok(content) => {
                debug!(agent = agent.name(), tool = %call.name, "tool call succeeded");
                Message::tool_result(agent.name(), call, content)
            }
            Err(e) => {
                warn!(agent = agent.name(), tool = %call.name, error = %e, "tool call failed");
                Message::tool_error(agent.name(), call, e.to_string())
            }
        }
    }
}

/// Strings are passed through as-is; anything else is rendered as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
