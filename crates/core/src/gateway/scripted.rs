//! Deterministic gateway that replays scripted responses.
//!
//! Used by tests and by the CLI demo, where no real model provider is
//! wired in. Responses are queued per requesting agent (or judge) name and
//! consumed in order. Every request is recorded so callers can inspect
//! exactly what each agent saw.

use crate::gateway::base::{GatewayError, GatewayRequest, GatewayResponse, ModelGateway};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tk_protocol::message_models::{HandoffTarget, ToolCall};

/// One scripted reply as written in a script file.
///
/// ```yaml
/// - type: tool_call
///   name: add
///   arguments: { a: 2, b: 3 }
/// - type: text
///   content: "5"
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptStep {
    Text {
        content: String,
    },
    Handoff {
        target: HandoffTarget,
        #[serde(default)]
        content: String,
    },
    ToolCall {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
    /// Simulates a provider failure.
    Error {
        message: String,
    },
}

/// A whole script file: replies per agent plus an optional default.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct GatewayScript {
    /// Reply used once an agent's queue is empty.
    #[serde(default)]
    pub default: Option<ScriptStep>,

    /// Queued replies keyed by agent (or judge) name.
    #[serde(default)]
    pub agents: HashMap<String, Vec<ScriptStep>>,
}

/// Replays queued responses; see the module docs.
pub struct ScriptedGateway {
    queues: Mutex<HashMap<String, VecDeque<Result<GatewayResponse, GatewayError>>>>,
    default_reply: Option<Result<GatewayResponse, GatewayError>>,
    requests: Mutex<Vec<GatewayRequest>>,
    call_counter: AtomicUsize,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            default_reply: None,
            requests: Mutex::new(Vec::new()),
            call_counter: AtomicUsize::new(0),
        }
    }

    /// Queue one response for `agent`.
    pub fn with_reply(self, agent: &str, response: GatewayResponse) -> Self {
        self.push(agent, Ok(response));
        self
    }

    /// Queue several responses for `agent`, consumed in order.
    pub fn with_replies(self, agent: &str, responses: impl IntoIterator<Item = GatewayResponse>) -> Self {
        for response in responses {
            self.push(agent, Ok(response));
        }
        self
    }

    /// Queue a failure for `agent`.
    pub fn with_error(self, agent: &str, error: GatewayError) -> Self {
        self.push(agent, Err(error));
        self
    }

    /// Reply used for any agent whose queue is empty.
    pub fn with_default(mut self, response: GatewayResponse) -> Self {
        self.default_reply = Some(Ok(response));
        self
    }

    /// Failure returned for any agent whose queue is empty.
    pub fn with_default_error(mut self, error: GatewayError) -> Self {
        self.default_reply = Some(Err(error));
        self
    }

    /// Build a gateway from a parsed script.
    pub fn from_script(script: GatewayScript) -> Self {
        let mut gateway = Self::new();
        for (agent, steps) in script.agents {
            for step in steps {
                let reply = gateway.step_to_reply(step);
                gateway.push(&agent, reply);
            }
        }
        if let Some(step) = script.default {
            gateway.default_reply = Some(gateway.step_to_reply(step));
        }
        gateway
    }

    /// Load a YAML script file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid script.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read script {}: {e}", path.display()))?;
        let script: GatewayScript = serde_yaml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse script {}: {e}", path.display()))?;
        Ok(Self::from_script(script))
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<GatewayRequest> {
        lock(&self.requests).clone()
    }

    /// Requests made by one agent.
    pub fn requests_for(&self, agent: &str) -> Vec<GatewayRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.agent == agent)
            .collect()
    }

    /// Number of queued responses left for `agent`.
    pub fn remaining(&self, agent: &str) -> usize {
        lock(&self.queues).get(agent).map_or(0, VecDeque::len)
    }

    fn push(&self, agent: &str, reply: Result<GatewayResponse, GatewayError>) {
        lock(&self.queues)
            .entry(agent.to_string())
            .or_default()
            .push_back(reply);
    }

    fn step_to_reply(&self, step: ScriptStep) -> Result<GatewayResponse, GatewayError> {
        match step {
            ScriptStep::Text { content } => Ok(GatewayResponse::Text(content)),
            ScriptStep::Handoff { target, content } => Ok(GatewayResponse::Handoff { target, content }),
            ScriptStep::ToolCall {
                id,
                name,
                arguments,
            } => {
                let id = id.unwrap_or_else(|| self.next_call_id());
                Ok(GatewayResponse::ToolCall(ToolCall::new(id, name, arguments)))
            }
            ScriptStep::Error { message } => Err(GatewayError::Network(message)),
        }
    }

    fn next_call_id(&self) -> String {
        let n = self.call_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("call-{n}")
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        lock(&self.requests).push(request.clone());

        let next = lock(&self.queues)
            .get_mut(&request.agent)
            .and_then(VecDeque::pop_front);

        match next {
            Some(reply) => reply,
            None => self
                .default_reply
                .clone()
                .unwrap_or_else(|| Err(GatewayError::Exhausted(request.agent.clone()))),
        }
    }
}

/// A panicking test thread must not make queued replies disappear.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use tk_protocol::message_models::Message;

    fn request_for(agent: &str) -> GatewayRequest {
        GatewayRequest {
            agent: agent.to_string(),
            model: "test-model".to_string(),
            instruction: String::new(),
            messages: vec![Message::user("task")],
            tools: vec![],
            handoffs: vec![],
        }
    }

    #[tokio::test]
    async fn test_replies_are_consumed_in_order() {
        let gateway = ScriptedGateway::new().with_replies(
            "writer",
            [GatewayResponse::text("draft"), GatewayResponse::text("DONE")],
        );

        let first = gateway.complete(&request_for("writer")).await.unwrap();
        let second = gateway.complete(&request_for("writer")).await.unwrap();
        let third = gateway.complete(&request_for("writer")).await;

        assert_eq!(first, GatewayResponse::text("draft"));
        assert_eq!(second, GatewayResponse::text("DONE"));
        assert_eq!(third, Err(GatewayError::Exhausted("writer".to_string())));
        assert_eq!(gateway.requests_for("writer").len(), 3);
    }

    #[tokio::test]
    async fn test_default_reply_and_errors() {
        let gateway = ScriptedGateway::new()
            .with_error("flaky", GatewayError::RateLimited("slow down".to_string()))
            .with_default(GatewayResponse::text("ok"));

        assert!(matches!(
            gateway.complete(&request_for("flaky")).await,
            Err(GatewayError::RateLimited(_))
        ));
        assert_eq!(
            gateway.complete(&request_for("flaky")).await.unwrap(),
            GatewayResponse::text("ok")
        );
        assert_eq!(
            gateway.complete(&request_for("anyone")).await.unwrap(),
            GatewayResponse::text("ok")
        );
    }

    #[tokio::test]
    async fn test_load_script_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("script.yaml");
        std::fs::write(
            &path,
            r#"
agents:
  calculator:
    - type: tool_call
      name: add
      arguments: { a: 2, b: 3 }
    - type: text
      content: "5"
  reviewer:
    - type: handoff
      target: user
      content: Which flight?
"#,
        )
        .unwrap();

        let gateway = ScriptedGateway::load(&path).unwrap();
        assert_eq!(gateway.remaining("calculator"), 2);

        let call = gateway.complete(&request_for("calculator")).await.unwrap();
        assert_eq!(
            call,
            GatewayResponse::ToolCall(ToolCall::new("call-1", "add", json!({"a": 2, "b": 3})))
        );

        let handoff = gateway.complete(&request_for("reviewer")).await.unwrap();
        assert!(matches!(
            handoff,
            GatewayResponse::Handoff { target: HandoffTarget::User, .. }
        ));
    }

    #[tokio::test]
    async fn test_script_default_error_is_kept() {
        let script: GatewayScript = serde_yaml::from_str(
            r#"
default:
  type: error
  message: provider down
agents:
  writer:
    - type: text
      content: draft
"#,
        )
        .unwrap();
        let gateway = ScriptedGateway::from_script(script);

        assert_eq!(
            gateway.complete(&request_for("writer")).await.unwrap(),
            GatewayResponse::text("draft")
        );
        assert_eq!(
            gateway.complete(&request_for("writer")).await,
            Err(GatewayError::Network("provider down".to_string()))
        );
    }

    #[tokio::test]
    async fn test_poisoned_queue_keeps_replies() {
        let gateway = ScriptedGateway::new().with_reply("writer", GatewayResponse::text("draft"));

        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = gateway.queues.lock().unwrap();
                    panic!("poison the queue lock");
                })
                .join();
        });
        assert!(gateway.queues.is_poisoned());

        let gateway = gateway.with_reply("writer", GatewayResponse::text("DONE"));
        assert_eq!(gateway.remaining("writer"), 2);
        assert_eq!(
            gateway.complete(&request_for("writer")).await.unwrap(),
            GatewayResponse::text("draft")
        );
        assert_eq!(gateway.requests().len(), 1);
    }

    #[test]
    fn test_load_missing_script_fails() {
        let dir = tempdir().unwrap();
        assert!(ScriptedGateway::load(&dir.path().join("missing.yaml")).is_err());
    }
}
