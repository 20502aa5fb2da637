//! Test fixtures for building teams and observing runs.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tk_core::agents::{Agent, AgentRoster};
use tk_core::engine::{
    AnyOf, FixedOrder, Orchestrator, RunConfig, SelectionStrategy, TerminationStrategy,
};
use tk_core::gateway::{GatewayError, GatewayRequest, GatewayResponse, ModelGateway};
use tk_protocol::events::RunEvent;
use tokio::sync::mpsc;

/// An orchestrator over `agents` with fixed-order selection.
pub fn fixed_order_team(
    agents: Vec<Agent>,
    termination: AnyOf,
    config: RunConfig,
) -> Orchestrator {
    team(agents, Arc::new(FixedOrder::new(vec![])), Arc::new(termination), config)
}

pub fn team(
    agents: Vec<Agent>,
    selection: Arc<dyn SelectionStrategy>,
    termination: Arc<dyn TerminationStrategy>,
    config: RunConfig,
) -> Orchestrator {
    let roster = AgentRoster::from_agents(agents).expect("unique agent names");
    Orchestrator::new("test-team", roster, selection, termination, config)
        .expect("valid orchestrator")
}

/// Event channel large enough that the tests never have to drain it mid-run.
pub fn event_channel() -> (mpsc::Sender<RunEvent>, mpsc::Receiver<RunEvent>) {
    mpsc::channel(256)
}

/// Everything currently buffered in `rx`.
pub fn drain(rx: &mut mpsc::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// A gateway whose calls for `agent` never complete; everyone else gets `reply`.
pub struct HangingGateway {
    pub agent: String,
    pub reply: String,
}

#[async_trait]
impl ModelGateway for HangingGateway {
    async fn complete(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        if request.agent == self.agent {
            std::future::pending::<()>().await;
        }
        Ok(GatewayResponse::text(self.reply.clone()))
    }
}

/// A gateway that serves `replies` in order and then never completes.
pub struct StallingGateway {
    replies: Mutex<VecDeque<GatewayResponse>>,
}

impl StallingGateway {
    pub fn new(replies: impl IntoIterator<Item = GatewayResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ModelGateway for StallingGateway {
    async fn complete(&self, _request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let next = self.replies.lock().expect("replies lock").pop_front();
        match next {
            Some(reply) => Ok(reply),
            None => std::future::pending().await,
        }
    }
}

/// Create a temporary project with one agent pair and one team.
///
/// Returns a TempDir that must be kept alive for the test duration.
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path();
    write_project(root)?;
    Ok(temp_dir)
}

fn write_project(root: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(root.join(".team-kit/agents"))?;
    std::fs::create_dir_all(root.join(".team-kit/teams"))?;

    std::fs::write(
        root.join(".team-kit/config.toml"),
        "default-max-iterations = 4\nhistory-window = 2\n",
    )?;

    std::fs::write(
        root.join(".team-kit/agents/reviewer.md"),
        r#"---
name: reviewer
description: Reviews drafts
model: test-model
---
Review the draft. Say DONE when it is good."#,
    )?;

    std::fs::write(
        root.join(".team-kit/agents/writer.md"),
        r#"---
name: writer
description: Writes drafts
model: test-model
tools: [add]
---
Write a draft."#,
    )?;

    std::fs::write(
        root.join(".team-kit/teams/pair.yaml"),
        r#"
name: pair
agents: [writer, reviewer]
selection:
  strategy: fixed-order
termination:
  - condition: keyword
    marker: DONE
"#,
    )?;

    Ok(())
}
