//! Tool trait and supporting types.

use async_trait::async_trait;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tk_protocol::tool_models::ToolSchema;

/// Failures while running a tool call.
///
/// None of these end a run: the executor reports them back to the agent as
/// a tool-role error message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    SchemaViolation { tool: String, reason: String },
    #[error("Tool {tool} failed: {reason}")]
    ExecutionFailure { tool: String, reason: String },
}

/// A callable an agent can ask the orchestrator to run.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration shown to the model and used for argument validation.
    fn schema(&self) -> &ToolSchema;

    /// Run the tool with already-validated arguments.
    async fn call(&self, arguments: &Value) -> anyhow::Result<Value>;

    fn name(&self) -> &str {
        &self.schema().name
    }
}

type ToolFn = dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync;

/// Adapts a synchronous function into a [`Tool`].
///
/// A panic inside the function is caught and reported as a failure.
pub struct FnTool {
    schema: ToolSchema,
    func: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(schema: ToolSchema, func: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            schema,
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn call(&self, arguments: &Value) -> anyhow::Result<Value> {
        match catch_unwind(AssertUnwindSafe(|| (self.func)(arguments))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(anyhow::anyhow!("panicked: {reason}"))
            }
        }
    }
}

/// Read a required argument, failing with a readable message.
pub fn arg<'a>(arguments: &'a Value, name: &str) -> anyhow::Result<&'a Value> {
    arguments
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("missing argument '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tk_protocol::tool_models::{ParamSpec, ParamType};

    fn echo_schema() -> ToolSchema {
        ToolSchema::new("echo", "Echo the text back")
            .with_param("text", ParamSpec::required(ParamType::String, "text"))
    }

    #[tokio::test]
    async fn test_fn_tool_call() {
        let tool = FnTool::new(echo_schema(), |args| Ok(arg(args, "text")?.clone()));

        assert_eq!(tool.name(), "echo");
        let value = tool.call(&json!({"text": "hi"})).await.unwrap();
        assert_eq!(value, json!("hi"));
    }

    #[tokio::test]
    async fn test_fn_tool_panic_is_caught() {
        let tool = FnTool::new(echo_schema(), |_| panic!("boom"));

        let err = tool.call(&json!({"text": "hi"})).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
