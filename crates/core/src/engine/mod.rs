//! Team execution engine.
//!
//! The [`Orchestrator`] owns the run loop: select the next agent, let it
//! act on the (windowed) transcript, run any tool calls it makes, append
//! everything to the transcript and check the stop conditions. Progress is
//! reported as [`RunEvent`]s over an mpsc channel.

pub mod error;
pub mod judge;
pub mod selection;
pub mod team;
pub mod termination;

pub use error::EngineError;
pub use judge::Judge;
pub use selection::{
    FixedOrder, HandoffSelection, JudgeSelection, Selection, SelectionStrategy, TurnContext,
};
pub use team::TeamBuilder;
pub use termination::{
    AnyOf, HandoffToUserTermination, IterationCap, JudgeTermination, KeywordTermination,
    TerminationStrategy, TextReplyTermination,
};

use crate::agents::{Agent, AgentRoster};
use crate::state::run::{
    append_message, begin_turn, cancel_run, complete_turn, create_run, fail_run, finish_run,
    record_fallback, record_tool_failure, resume_run, start_run, suspend_for_user, RunState,
};
use crate::tools::ToolExecutor;
use std::future::Future;
use std::sync::Arc;
use tk_protocol::config_models::DEFAULT_MAX_ITERATIONS;
use tk_protocol::events::RunEvent;
use tk_protocol::message_models::{HandoffTarget, Message, MessageKind};
use tk_protocol::run_models::{RunStatus, StopReason};
use tokio::sync::mpsc::{self, Sender};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tool calls an agent may chain within one turn unless configured otherwise.
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// Limits and defaults applied to every run of a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Turn ceiling; always enforced.
    pub max_iterations: u32,

    /// Messages each agent sees; `None` means the whole transcript.
    pub history_window: Option<usize>,

    /// Agent used when selection cannot be resolved; the first agent when `None`.
    pub default_agent: Option<String>,

    pub max_tool_rounds: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_window: None,
            default_agent: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

enum TurnOutcome {
    Completed,
    Cancelled,
}

/// Drives runs of one team.
///
/// Cheap to clone; everything inside is shared and read-only, so one
/// orchestrator can serve many concurrent runs.
#[derive(Clone)]
pub struct Orchestrator {
    team: String,
    roster: Arc<AgentRoster>,
    selection: Arc<dyn SelectionStrategy>,
    termination: Arc<dyn TerminationStrategy>,
    config: RunConfig,
}

impl Orchestrator {
    /// Create an orchestrator.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoAgents`] if the roster is empty
    /// - [`EngineError::InvalidConfig`] if a limit is zero or the default agent is unknown
    /// - [`EngineError::Roster`] if an agent may hand off to an unknown agent
    pub fn new(
        team: impl Into<String>,
        roster: AgentRoster,
        selection: Arc<dyn SelectionStrategy>,
        termination: Arc<dyn TerminationStrategy>,
        config: RunConfig,
    ) -> Result<Self, EngineError> {
        if roster.is_empty() {
            return Err(EngineError::NoAgents);
        }
        if config.max_iterations == 0 {
            return Err(EngineError::InvalidConfig(
                "max-iterations must be at least 1".to_string(),
            ));
        }
        if config.max_tool_rounds == 0 {
            return Err(EngineError::InvalidConfig(
                "max-tool-rounds must be at least 1".to_string(),
            ));
        }
        if let Some(default_agent) = &config.default_agent {
            if !roster.contains(default_agent) {
                return Err(EngineError::InvalidConfig(format!(
                    "default agent '{default_agent}' is not part of the team"
                )));
            }
        }
        roster.validate_handoffs()?;

        Ok(Self {
            team: team.into(),
            roster: Arc::new(roster),
            selection,
            termination,
            config,
        })
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// A fresh run state for this team, not yet started.
    pub fn new_run(&self) -> RunState {
        create_run(self.team.clone())
    }

    /// Run `task` to completion without observing events.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::execute`].
    pub async fn run(&self, task: impl Into<String>) -> Result<RunState, EngineError> {
        let (events_tx, events_rx) = mpsc::channel(1);
        drop(events_rx);
        self.run_with_events(task, &events_tx, &CancellationToken::new())
            .await
    }

    /// Run `task`, reporting progress on `events_tx`.
    ///
    /// The receiving side must be drained (or dropped); a full channel
    /// blocks the run.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::execute`].
    pub async fn run_with_events(
        &self,
        task: impl Into<String>,
        events_tx: &Sender<RunEvent>,
        cancel: &CancellationToken,
    ) -> Result<RunState, EngineError> {
        let mut state = self.new_run();
        self.execute(&mut state, task, events_tx, cancel).await?;
        Ok(state)
    }

    /// Start a pending run with `task` as the first user message and drive
    /// it until it stops, suspends or fails.
    ///
    /// On failure `state` is left in status `Failed`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Gateway`] if an agent or judge gateway call fails
    /// - [`EngineError::ToolRoundsExceeded`] if an agent chains too many tool calls
    pub async fn execute(
        &self,
        state: &mut RunState,
        task: impl Into<String>,
        events_tx: &Sender<RunEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        info!(run_id = %state.id, team = %self.team, "run started");
        start_run(state, events_tx).await;
        append_message(state, events_tx, Message::user(task)).await;
        self.drive(state, events_tx, cancel).await
    }

    /// Continue a run that is waiting for the user.
    ///
    /// `input` is appended as a user message handed back to the agent that
    /// handed off to the user.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotResumable`] unless the run is awaiting the user,
    /// plus everything [`Orchestrator::execute`] can return.
    pub async fn resume(
        &self,
        state: &mut RunState,
        input: impl Into<String>,
        events_tx: &Sender<RunEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if state.status != RunStatus::AwaitingUser {
            return Err(EngineError::NotResumable {
                run_id: state.id,
                status: state.status,
            });
        }

        let agent = state
            .transcript
            .last_handoff()
            .filter(|(_, target)| **target == HandoffTarget::User)
            .map(|(source, _)| source.to_string())
            .or_else(|| state.active_agent.clone())
            .or_else(|| self.roster.first().map(|a| a.name().to_string()))
            .ok_or(EngineError::NoAgents)?;

        info!(run_id = %state.id, agent = %agent, "run resumed by user");
        resume_run(state);
        append_message(state, events_tx, Message::user_handoff(input, agent)).await;
        self.drive(state, events_tx, cancel).await
    }

    /// Run `task` in the background and yield its events.
    ///
    /// Dropping the stream cancels the run. Cancelling `cancel` stops it as
    /// well; the last event is then a `RunFinished` with status `cancelled`.
    pub fn run_stream(
        &self,
        task: impl Into<String>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = RunEvent> + Send + 'static {
        let orchestrator = self.clone();
        let task = task.into();

        async_stream::stream! {
            let (events_tx, mut events_rx) = mpsc::channel(64);
            let token = cancel.child_token();
            let guard = token.clone().drop_guard();

            let handle = tokio::spawn(async move {
                if let Err(e) = orchestrator.run_with_events(task, &events_tx, &token).await {
                    debug!(error = %e, "streamed run ended with an error");
                }
            });

            while let Some(event) = events_rx.recv().await {
                yield event;
            }

            let _ = handle.await;
            let _ = guard.disarm();
        }
    }

    async fn drive(
        &self,
        state: &mut RunState,
        events_tx: &Sender<RunEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        match self.drive_turns(state, events_tx, cancel).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(run_id = %state.id, error = %e, "run failed");
                fail_run(state, events_tx, e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn drive_turns(
        &self,
        state: &mut RunState,
        events_tx: &Sender<RunEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        loop {
            if cancel.is_cancelled() {
                info!(run_id = %state.id, turn = state.turn, "run cancelled");
                cancel_run(state, events_tx).await;
                return Ok(());
            }

            if state.turn >= self.config.max_iterations {
                info!(
                    run_id = %state.id,
                    max = self.config.max_iterations,
                    "iteration ceiling reached"
                );
                let reason = StopReason::IterationCap {
                    max: self.config.max_iterations,
                };
                finish_run(state, events_tx, reason).await;
                return Ok(());
            }

            let selection = {
                let ctx = TurnContext {
                    transcript: &state.transcript,
                    roster: &self.roster,
                    turn: state.turn,
                };
                cancellable(cancel, self.selection.select(&ctx)).await
            };
            let selection = match selection {
                Some(selection) => selection?,
                None => continue,
            };

            let agent = match selection {
                Selection::Next(name) => match self.roster.get(&name) {
                    Some(agent) => Arc::clone(agent),
                    None => {
                        let reason = format!("unknown agent '{name}'");
                        self.fall_back(state, events_tx, Some(name), reason, None)
                            .await?
                    }
                },
                Selection::Unresolved {
                    requested,
                    reason,
                    fallback,
                } => {
                    self.fall_back(state, events_tx, requested, reason, fallback)
                        .await?
                }
                Selection::End => {
                    info!(run_id = %state.id, "no next agent");
                    finish_run(state, events_tx, StopReason::NoNextAgent).await;
                    return Ok(());
                }
            };

            begin_turn(state, events_tx, agent.name()).await;
            debug!(run_id = %state.id, turn = state.turn + 1, agent = agent.name(), "turn started");

            match self.take_turn(state, &agent, events_tx, cancel).await? {
                TurnOutcome::Completed => complete_turn(state),
                TurnOutcome::Cancelled => continue,
            }

            let verdict = {
                let ctx = TurnContext {
                    transcript: &state.transcript,
                    roster: &self.roster,
                    turn: state.turn,
                };
                cancellable(cancel, self.termination.should_stop(&ctx)).await
            };
            match verdict {
                Some(Ok(Some(StopReason::HandoffToUser))) => {
                    info!(run_id = %state.id, agent = agent.name(), "waiting for user");
                    suspend_for_user(state, events_tx).await;
                    return Ok(());
                }
                Some(Ok(Some(reason))) => {
                    info!(run_id = %state.id, turns = state.turn, reason = ?reason, "run finished");
                    finish_run(state, events_tx, reason).await;
                    return Ok(());
                }
                Some(Ok(None)) | None => {}
                Some(Err(e)) => return Err(e),
            }
        }
    }

    /// One agent turn: act, and keep acting while the agent calls tools.
    ///
    /// The turn's messages are held back until the turn completes or fails;
    /// a cancelled turn leaves the transcript as it was.
    async fn take_turn(
        &self,
        state: &mut RunState,
        agent: &Agent,
        events_tx: &Sender<RunEvent>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, EngineError> {
        let mut pending = Vec::new();
        let outcome = self.act_until_reply(state, agent, &mut pending, cancel).await;

        if let Ok(TurnOutcome::Cancelled) = outcome {
            debug!(
                run_id = %state.id,
                agent = agent.name(),
                discarded = pending.len(),
                "in-flight turn discarded"
            );
            return outcome;
        }

        for message in pending {
            if let MessageKind::ToolResult {
                name,
                is_error: true,
                ..
            } = &message.kind
            {
                record_tool_failure(state, events_tx, agent.name(), name, message.content.clone())
                    .await;
            }
            append_message(state, events_tx, message).await;
        }
        outcome
    }

    async fn act_until_reply(
        &self,
        state: &RunState,
        agent: &Agent,
        pending: &mut Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, EngineError> {
        let mut tool_rounds = 0;

        loop {
            let history = self.history(state, pending);
            let Some(reply) = cancellable(cancel, agent.act(&history)).await else {
                return Ok(TurnOutcome::Cancelled);
            };

            let message = reply.map_err(|e| EngineError::gateway(agent.name(), e))?;
            let call = message.tool_call_request().cloned();
            pending.push(message);

            let Some(call) = call else {
                return Ok(TurnOutcome::Completed);
            };

            if tool_rounds >= self.config.max_tool_rounds {
                return Err(EngineError::ToolRoundsExceeded {
                    agent: agent.name().to_string(),
                    limit: self.config.max_tool_rounds,
                });
            }
            tool_rounds += 1;

            pending.push(ToolExecutor::execute(agent, &call).await);
        }
    }

    /// Windowed view of the transcript followed by the current turn's messages.
    fn history(&self, state: &RunState, pending: &[Message]) -> Vec<Message> {
        let total = state.transcript.len() + pending.len();
        let skip = self
            .config
            .history_window
            .map_or(0, |n| total.saturating_sub(n));
        state
            .transcript
            .messages()
            .iter()
            .chain(pending)
            .skip(skip)
            .cloned()
            .collect()
    }

    /// Resolve the agent to use when selection could not name one.
    async fn fall_back(
        &self,
        state: &RunState,
        events_tx: &Sender<RunEvent>,
        requested: Option<String>,
        reason: String,
        fallback: Option<String>,
    ) -> Result<Arc<Agent>, EngineError> {
        let agent = fallback
            .as_deref()
            .and_then(|name| self.roster.get(name))
            .or_else(|| {
                self.config
                    .default_agent
                    .as_deref()
                    .and_then(|name| self.roster.get(name))
            })
            .or_else(|| self.roster.first())
            .cloned()
            .ok_or(EngineError::NoAgents)?;

        warn!(
            run_id = %state.id,
            requested = requested.as_deref().unwrap_or("-"),
            fallback = agent.name(),
            reason = %reason,
            "selection unresolved, using fallback agent"
        );
        record_fallback(state, events_tx, requested, agent.name(), reason).await;
        Ok(agent)
    }
}

/// Race `future` against cancellation; `None` means cancelled.
async fn cancellable<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}
