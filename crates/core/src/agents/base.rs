//! The conversational agent.

use crate::gateway::{GatewayError, GatewayRequest, GatewayResponse, ModelGateway};
use crate::tools::Tool;
use std::fmt;
use std::sync::Arc;
use tk_protocol::message_models::{HandoffTarget, Message};
use tk_protocol::tool_models::ToolSchema;

/// A named participant in a team conversation.
///
/// An agent is immutable once built and is shared between runs behind an
/// `Arc`. It never mutates the transcript itself: [`Agent::act`] returns the
/// next message and the orchestrator decides what to do with it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tk_core::agents::Agent;
/// use tk_core::gateway::{GatewayResponse, ScriptedGateway};
///
/// let gateway = ScriptedGateway::new().with_reply("writer", GatewayResponse::text("Draft"));
/// let agent = Agent::new("writer", Arc::new(gateway))
///     .with_instruction("Write short copy.")
///     .with_handoff("reviewer");
///
/// assert!(agent.can_handoff_to("reviewer"));
/// ```
#[derive(Clone)]
pub struct Agent {
    name: String,
    description: String,
    model: String,
    instruction: String,
    gateway: Arc<dyn ModelGateway>,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<HandoffTarget>,
}

impl Agent {
    pub fn new(name: impl Into<String>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            model: String::new(),
            instruction: String::new(),
            gateway,
            tools: Vec::new(),
            handoffs: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a tool. A later tool with the same name replaces the earlier one.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
        self
    }

    /// Permit a hand-off to `target` (an agent name or `"user"`).
    pub fn with_handoff(mut self, target: &str) -> Self {
        let target = HandoffTarget::parse(target);
        if !self.handoffs.contains(&target) {
            self.handoffs.push(target);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn handoffs(&self) -> &[HandoffTarget] {
        &self.handoffs
    }

    pub fn can_handoff_to(&self, target: &str) -> bool {
        self.handoffs.iter().any(|h| h.as_str() == target)
    }

    /// Look up one of this agent's declared tools.
    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema().clone()).collect()
    }

    /// Build the gateway request for the given conversation window.
    pub fn request(&self, messages: &[Message]) -> GatewayRequest {
        GatewayRequest {
            agent: self.name.clone(),
            model: self.model.clone(),
            instruction: self.instruction.clone(),
            messages: messages.to_vec(),
            tools: self.tool_schemas(),
            handoffs: self.handoffs.clone(),
        }
    }

    /// Produce the next message for the conversation.
    ///
    /// The gateway's answer is returned verbatim, tagged with this agent's
    /// name as its source.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error unchanged. Nothing is retried.
    pub async fn act(&self, messages: &[Message]) -> Result<Message, GatewayError> {
        let response = self.gateway.complete(&self.request(messages)).await?;

        Ok(match response {
            GatewayResponse::Text(content) => Message::assistant(&self.name, content),
            GatewayResponse::Handoff { target, content } => {
                Message::handoff(&self.name, target, content)
            }
            GatewayResponse::ToolCall(call) => Message::tool_call(&self.name, call),
        })
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("handoffs", &self.handoffs)
            .finish()
    }
}
