//! Run state machine implementation.
//!
//! This module provides functions for managing the lifecycle of a run,
//! including state transitions and event emission. Every transition that
//! observers care about is mirrored as a [`RunEvent`] on the channel.

use crate::state::transcript::Transcript;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tk_protocol::events::RunEvent;
use tk_protocol::message_models::Message;
use tk_protocol::run_models::{RunStatus, StopReason};
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

/// Everything known about one run of a team.
///
/// Owned by the orchestrator while the run is in progress; handed back to
/// the caller when the run stops or suspends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub id: Uuid,

    /// Name of the team executing this run.
    pub team: String,

    pub transcript: Transcript,

    /// Agent holding the floor in the current (or last) turn.
    pub active_agent: Option<String>,

    /// Number of completed turns.
    pub turn: u32,

    pub status: RunStatus,

    /// Set once the run stops or suspends on a stop condition.
    pub stop_reason: Option<StopReason>,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    /// Content of the last message, if any.
    pub fn final_output(&self) -> Option<&str> {
        self.transcript.last().map(|m| m.content.as_str())
    }
}

/// Create a new run with Pending status.
///
/// # Arguments
///
/// * `team` - The name of the team that will execute the run
pub fn create_run(team: impl Into<String>) -> RunState {
    RunState {
        id: Uuid::new_v4(),
        team: team.into(),
        transcript: Transcript::new(),
        active_agent: None,
        turn: 0,
        status: RunStatus::Pending,
        stop_reason: None,
        started_at: Utc::now(),
        finished_at: None,
    }
}

/// Transition the run to Running status and emit `RunStarted`.
pub async fn start_run(run: &mut RunState, events_tx: &Sender<RunEvent>) {
    run.status = RunStatus::Running;
    let _ = events_tx
        .send(RunEvent::RunStarted {
            run_id: run.id,
            team: run.team.clone(),
        })
        .await;
}

/// Append a message to the transcript and emit `MessageAppended`.
///
/// # Returns
///
/// The index of the new message.
pub async fn append_message(
    run: &mut RunState,
    events_tx: &Sender<RunEvent>,
    message: Message,
) -> usize {
    let index = run.transcript.push(message.clone());
    let _ = events_tx
        .send(RunEvent::MessageAppended {
            run_id: run.id,
            index,
            message,
        })
        .await;
    index
}

/// Hand the floor to `agent` and emit `TurnStarted`.
pub async fn begin_turn(run: &mut RunState, events_tx: &Sender<RunEvent>, agent: &str) {
    run.active_agent = Some(agent.to_string());
    let _ = events_tx
        .send(RunEvent::TurnStarted {
            run_id: run.id,
            turn: run.turn + 1,
            agent: agent.to_string(),
        })
        .await;
}

/// Count the current turn as completed.
pub fn complete_turn(run: &mut RunState) {
    run.turn += 1;
}

/// Report that selection fell back to another agent.
pub async fn record_fallback(
    run: &RunState,
    events_tx: &Sender<RunEvent>,
    requested: Option<String>,
    fallback: &str,
    reason: String,
) {
    let _ = events_tx
        .send(RunEvent::SelectionFallback {
            run_id: run.id,
            requested,
            fallback: fallback.to_string(),
            reason,
        })
        .await;
}

/// Report a tool call that failed and was reported back to the agent.
pub async fn record_tool_failure(
    run: &RunState,
    events_tx: &Sender<RunEvent>,
    agent: &str,
    tool: &str,
    error: String,
) {
    let _ = events_tx
        .send(RunEvent::ToolFailed {
            run_id: run.id,
            agent: agent.to_string(),
            tool: tool.to_string(),
            error,
        })
        .await;
}

/// Suspend the run until the user replies and emit `RunSuspended`.
pub async fn suspend_for_user(run: &mut RunState, events_tx: &Sender<RunEvent>) {
    run.status = RunStatus::AwaitingUser;
    run.stop_reason = Some(StopReason::HandoffToUser);
    let _ = events_tx
        .send(RunEvent::RunSuspended {
            run_id: run.id,
            agent: run.active_agent.clone().unwrap_or_default(),
        })
        .await;
}

/// Resume a suspended run.
pub fn resume_run(run: &mut RunState) {
    run.status = RunStatus::Running;
    run.stop_reason = None;
}

/// Stop the run for `reason` and emit `RunFinished`.
///
/// The resulting status follows from the reason: the iteration cap leads
/// to `CeilingReached`, everything else to `Satisfied`.
pub async fn finish_run(run: &mut RunState, events_tx: &Sender<RunEvent>, reason: StopReason) {
    run.status = reason.status();
    run.stop_reason = Some(reason);
    run.finished_at = Some(Utc::now());
    let _ = events_tx
        .send(RunEvent::RunFinished {
            run_id: run.id,
            status: run.status,
            reason: run.stop_reason.clone(),
            turns: run.turn,
        })
        .await;
}

/// Mark the run as cancelled and emit `RunFinished`.
pub async fn cancel_run(run: &mut RunState, events_tx: &Sender<RunEvent>) {
    run.status = RunStatus::Cancelled;
    run.finished_at = Some(Utc::now());
    let _ = events_tx
        .send(RunEvent::RunFinished {
            run_id: run.id,
            status: run.status,
            reason: None,
            turns: run.turn,
        })
        .await;
}

/// Mark the run as failed and emit `RunFailed`.
pub async fn fail_run(run: &mut RunState, events_tx: &Sender<RunEvent>, error: String) {
    run.status = RunStatus::Failed;
    run.finished_at = Some(Utc::now());
    let _ = events_tx
        .send(RunEvent::RunFailed {
            run_id: run.id,
            error,
        })
        .await;
}
