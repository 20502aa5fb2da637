//! Conversation message models.
//!
//! A run's transcript is an ordered list of [`Message`]s. Control signals
//! (hand-offs, tool calls, tool results) are carried as a tagged
//! [`MessageKind`] rather than being encoded inside the message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Name of the external-user sentinel that agents can hand off to.
pub const USER_SENTINEL: &str = "user";

/// Who produced a message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions injected by the host application.
    System,
    /// Input from the external user (the initial task or a reply after a hand-off).
    User,
    /// Output produced by an agent.
    Assistant,
    /// Result of a tool invocation.
    Tool,
}

/// The receiver of a hand-off.
///
/// Serialized as a plain string: the literal `"user"` maps to [`HandoffTarget::User`],
/// any other string names an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandoffTarget {
    /// The external user; the run suspends until the user replies.
    User,
    /// Another agent, referenced by name.
    Agent(String),
}

impl HandoffTarget {
    /// Build a target from its string form.
    pub fn parse(name: &str) -> Self {
        if name == USER_SENTINEL {
            Self::User
        } else {
            Self::Agent(name.to_string())
        }
    }

    /// The string form of this target.
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => USER_SENTINEL,
            Self::Agent(name) => name,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for HandoffTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HandoffTarget {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl<'de> Deserialize<'de> for HandoffTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() {
            return Err(serde::de::Error::custom("hand-off target must not be empty"));
        }
        Ok(Self::parse(&s))
    }
}

impl Serialize for HandoffTarget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A request from an agent to invoke one of its declared tools.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ToolCall {
    /// Identifier correlating the call with its result message.
    pub id: String,

    /// Name of the tool to invoke.
    pub name: String,

    /// Arguments as a JSON object, keyed by parameter name.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// What a message means to the orchestrator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain conversational text.
    Text,

    /// Transfer of conversational authority to another agent or the user.
    Handoff {
        #[ts(type = "string")]
        target: HandoffTarget,
    },

    /// The source agent asks for a tool to be run.
    ToolCall { call: ToolCall },

    /// Outcome of a tool call; `is_error` marks failures reported back to the agent.
    ToolResult {
        call_id: String,
        name: String,
        is_error: bool,
    },
}

/// A single entry in a run's transcript.
///
/// # Example
///
/// ```json
/// {
///   "role": "assistant",
///   "content": "Passing this to the refund desk.",
///   "source": "travel_agent",
///   "kind": { "type": "handoff", "target": "flights_refunder" }
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Message {
    pub role: Role,

    /// Text content. Empty for tool calls that carry no commentary.
    #[serde(default)]
    pub content: String,

    /// Name of the agent (or `"user"`) that produced the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub kind: MessageKind,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            source: None,
            kind: MessageKind::Text,
        }
    }

    /// A user message such as the initial task.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            source: Some(USER_SENTINEL.to_string()),
            kind: MessageKind::Text,
        }
    }

    /// A user reply that hands the conversation back to an agent.
    pub fn user_handoff(content: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            source: Some(USER_SENTINEL.to_string()),
            kind: MessageKind::Handoff {
                target: HandoffTarget::parse(&target.into()),
            },
        }
    }

    pub fn assistant(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            source: Some(source.into()),
            kind: MessageKind::Text,
        }
    }

    pub fn handoff(
        source: impl Into<String>,
        target: HandoffTarget,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            source: Some(source.into()),
            kind: MessageKind::Handoff { target },
        }
    }

    pub fn tool_call(source: impl Into<String>, call: ToolCall) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            source: Some(source.into()),
            kind: MessageKind::ToolCall { call },
        }
    }

    /// A successful tool result attributed to the agent that requested it.
    pub fn tool_result(source: impl Into<String>, call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            source: Some(source.into()),
            kind: MessageKind::ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                is_error: false,
            },
        }
    }

    /// A failed tool result; `description` is shown to the agent instead of a value.
    pub fn tool_error(source: impl Into<String>, call: &ToolCall, description: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: description.into(),
            source: Some(source.into()),
            kind: MessageKind::ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                is_error: true,
            },
        }
    }

    /// Hand-off target, if this message is a hand-off.
    pub fn target(&self) -> Option<&HandoffTarget> {
        match &self.kind {
            MessageKind::Handoff { target } => Some(target),
            _ => None,
        }
    }

    /// Tool call descriptor, if this message requests a tool.
    pub fn tool_call_request(&self) -> Option<&ToolCall> {
        match &self.kind {
            MessageKind::ToolCall { call } => Some(call),
            _ => None,
        }
    }

    pub fn is_handoff(&self) -> bool {
        matches!(self.kind, MessageKind::Handoff { .. })
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self.kind, MessageKind::ToolCall { .. })
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self.kind, MessageKind::ToolResult { .. })
    }

    /// True for tool results that report a failure.
    pub fn is_tool_error(&self) -> bool {
        matches!(self.kind, MessageKind::ToolResult { is_error: true, .. })
    }

    /// True for messages that end an agent's turn: assistant text or a hand-off.
    pub fn ends_turn(&self) -> bool {
        self.role == Role::Assistant && !self.is_tool_call()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handoff_target_parse() {
        assert_eq!(HandoffTarget::parse("user"), HandoffTarget::User);
        assert_eq!(
            HandoffTarget::parse("writer"),
            HandoffTarget::Agent("writer".to_string())
        );
        assert!(HandoffTarget::User.is_user());
        assert_eq!(HandoffTarget::Agent("a".into()).to_string(), "a");
    }

    #[test]
    fn test_handoff_target_rejects_empty() {
        let result: Result<HandoffTarget, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_handoff_message_json_shape() {
        let msg = Message::handoff("reviewer", HandoffTarget::parse("writer"), "Please revise");
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["source"], "reviewer");
        assert_eq!(value["kind"]["type"], "handoff");
        assert_eq!(value["kind"]["target"], "writer");
    }

    #[test]
    fn test_tool_call_message_accessors() {
        let call = ToolCall::new("call-1", "add", json!({"a": 2, "b": 3}));
        let msg = Message::tool_call("calculator", call.clone());

        assert!(msg.is_tool_call());
        assert!(!msg.ends_turn());
        assert_eq!(msg.tool_call_request(), Some(&call));
        assert!(msg.target().is_none());
    }

    #[test]
    fn test_tool_error_is_flagged() {
        let call = ToolCall::new("call-1", "missing", json!({}));
        let ok = Message::tool_result("a", &call, "5");
        let err = Message::tool_error("a", &call, "boom");

        assert!(ok.is_tool_result());
        assert!(!ok.is_tool_error());
        assert!(err.is_tool_error());
        assert_eq!(err.role, Role::Tool);
    }

    #[test]
    fn test_user_message_without_source_deserializes() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"user","content":"hi","kind":{"type":"text"}}"#)
                .unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(msg.source.is_none());
        assert!(!msg.ends_turn());
    }
}
