//! Stop conditions evaluated after every turn.

use crate::engine::error::EngineError;
use crate::engine::judge::Judge;
use crate::engine::selection::TurnContext;
use async_trait::async_trait;
use std::sync::Arc;
use tk_protocol::message_models::{MessageKind, Role};
use tk_protocol::run_models::StopReason;

#[async_trait]
pub trait TerminationStrategy: Send + Sync {
    /// Decide whether the run should stop after the turn just completed.
    ///
    /// # Errors
    ///
    /// Only judge-backed conditions fail, when their gateway call fails.
    async fn should_stop(&self, ctx: &TurnContext<'_>) -> Result<Option<StopReason>, EngineError>;
}

/// Stops when the last message contains a marker.
pub struct KeywordTermination {
    marker: String,
    case_sensitive: bool,
}

impl KeywordTermination {
    /// Case-insensitive match on `marker`.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    fn matches(&self, content: &str) -> bool {
        if self.case_sensitive {
            content.contains(&self.marker)
        } else {
            content.to_lowercase().contains(&self.marker.to_lowercase())
        }
    }
}

#[async_trait]
impl TerminationStrategy for KeywordTermination {
    async fn should_stop(&self, ctx: &TurnContext<'_>) -> Result<Option<StopReason>, EngineError> {
        let hit = ctx
            .transcript
            .last()
            .is_some_and(|m| !self.marker.is_empty() && self.matches(&m.content));

        Ok(hit.then(|| StopReason::Keyword {
            marker: self.marker.clone(),
        }))
    }
}

/// Suspends the run when the last message hands off to the user.
pub struct HandoffToUserTermination;

#[async_trait]
impl TerminationStrategy for HandoffToUserTermination {
    async fn should_stop(&self, ctx: &TurnContext<'_>) -> Result<Option<StopReason>, EngineError> {
        let hit = ctx
            .transcript
            .last()
            .and_then(|m| m.target())
            .is_some_and(|t| t.is_user());
        Ok(hit.then_some(StopReason::HandoffToUser))
    }
}

/// Stops once an agent answers with plain text.
///
/// The natural end of a single agent working through tool calls: the
/// loop runs until the model replies with a final answer.
pub struct TextReplyTermination;

#[async_trait]
impl TerminationStrategy for TextReplyTermination {
    async fn should_stop(&self, ctx: &TurnContext<'_>) -> Result<Option<StopReason>, EngineError> {
        let hit = ctx
            .transcript
            .last()
            .is_some_and(|m| m.role == Role::Assistant && m.kind == MessageKind::Text);
        Ok(hit.then_some(StopReason::TextReply))
    }
}

/// Asks a judge whether the last agent message is satisfactory.
pub struct JudgeTermination {
    judge: Judge,
    keyword: String,
    agents: Vec<String>,
}

impl JudgeTermination {
    pub fn new(judge: Judge, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self {
            judge: judge.with_keyword(&keyword),
            keyword,
            agents: Vec::new(),
        }
    }

    /// Only consult the judge after turns by these agents.
    pub fn for_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }
}

#[async_trait]
impl TerminationStrategy for JudgeTermination {
    async fn should_stop(&self, ctx: &TurnContext<'_>) -> Result<Option<StopReason>, EngineError> {
        let Some(last) = ctx.transcript.last_agent_turn() else {
            return Ok(None);
        };

        if !self.agents.is_empty() {
            let source = last.source_name().unwrap_or_default();
            if !self.agents.iter().any(|a| a == source) {
                return Ok(None);
            }
        }

        let answer = self
            .judge
            .ask(ctx.transcript.messages(), &ctx.roster.describe())
            .await?;

        let satisfied = answer
            .is_some_and(|a| a.to_lowercase().contains(&self.keyword.to_lowercase()));
        Ok(satisfied.then_some(StopReason::JudgeSatisfied))
    }
}

/// Stops after a fixed number of turns.
pub struct IterationCap {
    max: u32,
}

impl IterationCap {
    pub fn new(max: u32) -> Self {
        Self { max }
    }
}

#[async_trait]
impl TerminationStrategy for IterationCap {
    async fn should_stop(&self, ctx: &TurnContext<'_>) -> Result<Option<StopReason>, EngineError> {
        Ok((ctx.turn >= self.max).then_some(StopReason::IterationCap { max: self.max }))
    }
}

/// Logical OR of several conditions, evaluated in order.
///
/// An empty `AnyOf` never stops; the orchestrator's iteration ceiling
/// still applies.
#[derive(Default, Clone)]
pub struct AnyOf {
    conditions: Vec<Arc<dyn TerminationStrategy>>,
}

impl AnyOf {
    pub fn new(conditions: Vec<Arc<dyn TerminationStrategy>>) -> Self {
        Self { conditions }
    }

    pub fn or(mut self, condition: impl TerminationStrategy + 'static) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[async_trait]
impl TerminationStrategy for AnyOf {
    async fn should_stop(&self, ctx: &TurnContext<'_>) -> Result<Option<StopReason>, EngineError> {
        for condition in &self.conditions {
            if let Some(reason) = condition.should_stop(ctx).await? {
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }
}
