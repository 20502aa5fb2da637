//! Model gateway trait and supporting types.

use async_trait::async_trait;
use thiserror::Error;
use tk_protocol::message_models::{HandoffTarget, Message, ToolCall};
use tk_protocol::tool_models::ToolSchema;

/// Everything a gateway needs to produce the next message for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    /// Name of the agent (or judge) making the request.
    pub agent: String,

    /// Model identifier from the agent definition.
    pub model: String,

    /// System instruction.
    pub instruction: String,

    /// Conversation so far, already windowed.
    pub messages: Vec<Message>,

    /// Tools the agent may call.
    pub tools: Vec<ToolSchema>,

    /// Targets the agent may hand off to.
    pub handoffs: Vec<HandoffTarget>,
}

impl GatewayRequest {
    /// Content of the most recent tool result visible to the model, if any.
    pub fn last_tool_result(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_tool_result())
            .map(|m| m.content.as_str())
    }
}

/// Exactly one of the three things a model can answer with.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    /// Plain assistant text.
    Text(String),

    /// Hand the conversation to another agent or the user.
    Handoff {
        target: HandoffTarget,
        content: String,
    },

    /// Ask for a tool to be run.
    ToolCall(ToolCall),
}

impl GatewayResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn handoff(target: &str, content: impl Into<String>) -> Self {
        Self::Handoff {
            target: HandoffTarget::parse(target),
            content: content.into(),
        }
    }
}

/// Failures reported by a model gateway.
///
/// The orchestrator never retries these; a failing call ends the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("No scripted response left for {0}")]
    Exhausted(String),
}

/// The LLM inference capability consumed by agents and judges.
///
/// Implementations must be shareable across concurrent runs.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}
