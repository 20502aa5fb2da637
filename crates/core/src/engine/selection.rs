//! Strategies that choose the next speaker.
//!
//! A decision is a function of the transcript and the strategy's own
//! construction-time configuration. Strategies never fall back on their
//! own: anything they cannot resolve is reported as
//! [`Selection::Unresolved`] and the orchestrator picks a fallback agent.

use crate::agents::AgentRoster;
use crate::engine::error::EngineError;
use crate::engine::judge::Judge;
use crate::state::Transcript;
use async_trait::async_trait;
use tk_protocol::message_models::{HandoffTarget, Message, Role, USER_SENTINEL};
use tk_protocol::team_models::NoHandoffPolicy;

/// Read-only view of a run handed to strategies.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub transcript: &'a Transcript,
    pub roster: &'a AgentRoster,
    /// Number of completed turns.
    pub turn: u32,
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// This agent takes the next turn.
    Next(String),

    /// No usable agent could be determined.
    Unresolved {
        requested: Option<String>,
        reason: String,
        /// Strategy-specific fallback; the team default is used when absent.
        fallback: Option<String>,
    },

    /// Nobody should speak next; the run stops.
    End,
}

#[async_trait]
pub trait SelectionStrategy: Send + Sync {
    /// Choose who speaks next.
    ///
    /// # Errors
    ///
    /// Only judge-backed strategies fail, when their gateway call fails.
    async fn select(&self, ctx: &TurnContext<'_>) -> Result<Selection, EngineError>;
}

/// Cycles through a fixed order.
pub struct FixedOrder {
    order: Vec<String>,
}

impl FixedOrder {
    /// An empty `order` means the roster's declaration order.
    pub fn new(order: Vec<String>) -> Self {
        Self { order }
    }
}

#[async_trait]
impl SelectionStrategy for FixedOrder {
    async fn select(&self, ctx: &TurnContext<'_>) -> Result<Selection, EngineError> {
        let order: Vec<&str> = if self.order.is_empty() {
            ctx.roster.names()
        } else {
            self.order.iter().map(String::as_str).collect()
        };

        let Some(first) = order.first() else {
            return Ok(Selection::End);
        };

        let next = ctx
            .transcript
            .agent_turn_sources()
            .last()
            .and_then(|last| order.iter().position(|name| name == last))
            .map_or(*first, |i| order[(i + 1) % order.len()]);

        Ok(Selection::Next(next.to_string()))
    }
}

/// Follows hand-offs.
///
/// The first turn goes to `initial`. After that the target of the most
/// recent hand-off takes the floor, provided the agent that made the
/// hand-off is permitted to address it. The user may hand off to any agent.
pub struct HandoffSelection {
    initial: String,
    on_no_handoff: NoHandoffPolicy,
    default_agent: Option<String>,
}

impl HandoffSelection {
    pub fn new(initial: impl Into<String>, on_no_handoff: NoHandoffPolicy) -> Self {
        Self {
            initial: initial.into(),
            on_no_handoff,
            default_agent: None,
        }
    }

    /// Agent used by [`NoHandoffPolicy::Default`]; the first roster agent when unset.
    pub fn with_default_agent(mut self, agent: Option<String>) -> Self {
        self.default_agent = agent;
        self
    }

    fn route(&self, message: &Message, target: &HandoffTarget, roster: &AgentRoster) -> Selection {
        let name = match target {
            HandoffTarget::User => return Selection::End,
            HandoffTarget::Agent(name) => name,
        };

        let source = message.source_name().unwrap_or(USER_SENTINEL);
        if source == USER_SENTINEL {
            return Selection::Next(name.clone());
        }

        match roster.get(source) {
            Some(agent) if agent.can_handoff_to(name) => Selection::Next(name.clone()),
            _ => Selection::Unresolved {
                requested: Some(name.clone()),
                reason: format!("'{source}' is not permitted to hand off to '{name}'"),
                fallback: None,
            },
        }
    }
}

#[async_trait]
impl SelectionStrategy for HandoffSelection {
    async fn select(&self, ctx: &TurnContext<'_>) -> Result<Selection, EngineError> {
        let last = ctx
            .transcript
            .messages()
            .iter()
            .rev()
            .find(|m| m.ends_turn() || m.role == Role::User);

        let Some(last) = last else {
            return Ok(Selection::Next(self.initial.clone()));
        };

        if let Some(target) = last.target() {
            return Ok(self.route(last, target, ctx.roster));
        }

        if last.role == Role::User {
            return Ok(Selection::Next(self.initial.clone()));
        }

        Ok(match self.on_no_handoff {
            NoHandoffPolicy::Stay => match last.source_name() {
                Some(source) => Selection::Next(source.to_string()),
                None => Selection::Next(self.initial.clone()),
            },
            NoHandoffPolicy::Default => {
                let fallback = self
                    .default_agent
                    .as_deref()
                    .or_else(|| ctx.roster.first().map(|a| a.name()));
                match fallback {
                    Some(name) => Selection::Next(name.to_string()),
                    None => Selection::End,
                }
            }
            NoHandoffPolicy::End => Selection::End,
        })
    }
}

/// Lets a judge model name the next speaker.
pub struct JudgeSelection {
    judge: Judge,
    initial: String,
    fallback: String,
}

impl JudgeSelection {
    pub fn new(judge: Judge, initial: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            judge,
            initial: initial.into(),
            fallback: fallback.into(),
        }
    }

    /// Fallback to use instead of `excluded`.
    fn fallback_excluding(&self, excluded: &str, roster: &AgentRoster) -> Option<String> {
        if self.fallback != excluded {
            return Some(self.fallback.clone());
        }
        roster
            .names()
            .into_iter()
            .find(|name| *name != excluded)
            .map(str::to_string)
    }
}

#[async_trait]
impl SelectionStrategy for JudgeSelection {
    async fn select(&self, ctx: &TurnContext<'_>) -> Result<Selection, EngineError> {
        let sources = ctx.transcript.agent_turn_sources();
        if sources.is_empty() {
            return Ok(Selection::Next(self.initial.clone()));
        }

        let participants = ctx.roster.describe();
        let Some(answer) = self
            .judge
            .ask(ctx.transcript.messages(), &participants)
            .await?
        else {
            return Ok(Selection::Unresolved {
                requested: None,
                reason: "judge gave no answer".to_string(),
                fallback: Some(self.fallback.clone()),
            });
        };

        let names = ctx.roster.names();
        let Some(chosen) = parse_agent_name(&answer, &names) else {
            return Ok(Selection::Unresolved {
                requested: Some(answer),
                reason: "judge did not name a participant".to_string(),
                fallback: Some(self.fallback.clone()),
            });
        };

        // An agent may not author three agent turns in a row.
        let repeats = sources.len() >= 2 && sources[sources.len() - 2..].iter().all(|s| *s == chosen);
        if repeats {
            return Ok(Selection::Unresolved {
                requested: Some(chosen.to_string()),
                reason: format!("'{chosen}' authored the last two turns"),
                fallback: self.fallback_excluding(chosen, ctx.roster),
            });
        }

        Ok(Selection::Next(chosen.to_string()))
    }
}

/// Match a free-form judge answer against the legal agent names.
///
/// The first non-empty line is trimmed of whitespace, quotes and
/// punctuation and compared case-insensitively. Failing that, a name that
/// is the only one contained in the answer is accepted.
pub fn parse_agent_name<'a>(answer: &str, names: &[&'a str]) -> Option<&'a str> {
    let line = answer.lines().map(str::trim).find(|l| !l.is_empty())?;
    let cleaned = line
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
        .to_lowercase();

    if let Some(name) = names.iter().find(|n| n.to_lowercase() == cleaned) {
        return Some(*name);
    }

    let haystack = answer.to_lowercase();
    let mut contained = names.iter().filter(|n| haystack.contains(&n.to_lowercase()));
    match (contained.next(), contained.next()) {
        (Some(name), None) => Some(*name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Agent;
    use crate::gateway::{GatewayResponse, ScriptedGateway};
    use crate::state::Transcript;
    use std::sync::Arc;

    fn roster(agents: Vec<Agent>) -> AgentRoster {
        AgentRoster::from_agents(agents).unwrap()
    }

    fn agent(name: &str) -> Agent {
        Agent::new(name, Arc::new(ScriptedGateway::new()))
    }

    fn transcript(messages: Vec<Message>) -> Transcript {
        Transcript::from(messages)
    }

    async fn select(
        strategy: &dyn SelectionStrategy,
        roster: &AgentRoster,
        transcript: &Transcript,
    ) -> Selection {
        let ctx = TurnContext {
            transcript,
            roster,
            turn: 0,
        };
        strategy.select(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_fixed_order_cycles() {
        let roster = roster(vec![agent("a"), agent("b"), agent("c")]);
        let strategy = FixedOrder::new(vec![]);

        let t = transcript(vec![Message::user("task")]);
        assert_eq!(select(&strategy, &roster, &t).await, Selection::Next("a".into()));

        let t = transcript(vec![
            Message::user("task"),
            Message::assistant("a", "1"),
            Message::assistant("b", "2"),
            Message::assistant("c", "3"),
        ]);
        assert_eq!(select(&strategy, &roster, &t).await, Selection::Next("a".into()));

        let custom = FixedOrder::new(vec!["c".into(), "a".into()]);
        let t = transcript(vec![Message::user("task"), Message::assistant("c", "1")]);
        assert_eq!(select(&custom, &roster, &t).await, Selection::Next("a".into()));
    }

    #[tokio::test]
    async fn test_handoff_follows_permitted_target() {
        let roster = roster(vec![
            agent("travel_agent").with_handoff("flights_refunder"),
            agent("flights_refunder"),
        ]);
        let strategy = HandoffSelection::new("travel_agent", NoHandoffPolicy::Stay);

        let t = transcript(vec![Message::user("refund please")]);
        assert_eq!(
            select(&strategy, &roster, &t).await,
            Selection::Next("travel_agent".into())
        );

        let t = transcript(vec![
            Message::user("refund please"),
            Message::handoff("travel_agent", HandoffTarget::parse("flights_refunder"), ""),
        ]);
        assert_eq!(
            select(&strategy, &roster, &t).await,
            Selection::Next("flights_refunder".into())
        );
    }

    #[tokio::test]
    async fn test_handoff_rejects_unpermitted_target() {
        let roster = roster(vec![agent("travel_agent"), agent("flights_refunder")]);
        let strategy = HandoffSelection::new("travel_agent", NoHandoffPolicy::Stay);

        let t = transcript(vec![
            Message::user("refund please"),
            Message::handoff("travel_agent", HandoffTarget::parse("flights_refunder"), ""),
        ]);
        assert!(matches!(
            select(&strategy, &roster, &t).await,
            Selection::Unresolved { requested: Some(name), fallback: None, .. } if name == "flights_refunder"
        ));
    }

    #[tokio::test]
    async fn test_user_handoff_may_name_any_agent() {
        let roster = roster(vec![agent("travel_agent"), agent("flights_refunder")]);
        let strategy = HandoffSelection::new("travel_agent", NoHandoffPolicy::Stay);

        let t = transcript(vec![
            Message::user("refund please"),
            Message::handoff("flights_refunder", HandoffTarget::User, "Which flight?"),
            Message::user_handoff("XY123", "flights_refunder"),
        ]);
        assert_eq!(
            select(&strategy, &roster, &t).await,
            Selection::Next("flights_refunder".into())
        );
    }

    #[tokio::test]
    async fn test_no_handoff_policies() {
        let roster = roster(vec![agent("a"), agent("b")]);
        let t = transcript(vec![Message::user("task"), Message::assistant("b", "hello")]);

        let stay = HandoffSelection::new("a", NoHandoffPolicy::Stay);
        assert_eq!(select(&stay, &roster, &t).await, Selection::Next("b".into()));

        let default = HandoffSelection::new("a", NoHandoffPolicy::Default);
        assert_eq!(select(&default, &roster, &t).await, Selection::Next("a".into()));

        let default_b = HandoffSelection::new("a", NoHandoffPolicy::Default)
            .with_default_agent(Some("b".to_string()));
        assert_eq!(select(&default_b, &roster, &t).await, Selection::Next("b".into()));

        let end = HandoffSelection::new("a", NoHandoffPolicy::End);
        assert_eq!(select(&end, &roster, &t).await, Selection::End);
    }

    #[tokio::test]
    async fn test_handoff_to_user_ends_selection() {
        let roster = roster(vec![agent("a").with_handoff("user")]);
        let strategy = HandoffSelection::new("a", NoHandoffPolicy::Stay);
        let t = transcript(vec![
            Message::user("task"),
            Message::handoff("a", HandoffTarget::User, "?"),
        ]);
        assert_eq!(select(&strategy, &roster, &t).await, Selection::End);
    }

    fn judge_selection(answers: &[&str]) -> JudgeSelection {
        let gateway = ScriptedGateway::new().with_replies(
            "selection-judge",
            answers.iter().map(|a| GatewayResponse::text(*a)),
        );
        let judge = Judge::new("selection-judge", Arc::new(gateway), "m", "{{participants}}");
        JudgeSelection::new(judge, "reviewer", "writer")
    }

    #[tokio::test]
    async fn test_judge_initial_and_choice() {
        let roster = roster(vec![agent("reviewer"), agent("writer")]);
        let strategy = judge_selection(&["\"Writer\"."]);

        let t = transcript(vec![Message::user("task")]);
        assert_eq!(
            select(&strategy, &roster, &t).await,
            Selection::Next("reviewer".into())
        );

        let t = transcript(vec![Message::user("task"), Message::assistant("reviewer", "ok")]);
        assert_eq!(
            select(&strategy, &roster, &t).await,
            Selection::Next("writer".into())
        );
    }

    #[tokio::test]
    async fn test_judge_unknown_answer_falls_back() {
        let roster = roster(vec![agent("reviewer"), agent("writer")]);
        let strategy = judge_selection(&["the editor"]);

        let t = transcript(vec![Message::user("task"), Message::assistant("reviewer", "ok")]);
        assert!(matches!(
            select(&strategy, &roster, &t).await,
            Selection::Unresolved { fallback: Some(f), .. } if f == "writer"
        ));
    }

    #[tokio::test]
    async fn test_judge_anti_repeat() {
        let roster = roster(vec![agent("reviewer"), agent("writer")]);
        let t = transcript(vec![
            Message::user("task"),
            Message::assistant("writer", "draft 1"),
            Message::assistant("writer", "draft 2"),
        ]);

        // fallback is the repeating agent, so the other agent is used
        let strategy = judge_selection(&["writer"]);
        assert!(matches!(
            select(&strategy, &roster, &t).await,
            Selection::Unresolved { requested: Some(r), fallback: Some(f), .. }
                if r == "writer" && f == "reviewer"
        ));
    }

    #[test]
    fn test_parse_agent_name() {
        let names = ["reviewer", "writer", "flights_refunder"];
        assert_eq!(parse_agent_name("Writer", &names), Some("writer"));
        assert_eq!(parse_agent_name("  'reviewer'!\nbecause", &names), Some("reviewer"));
        assert_eq!(parse_agent_name("I pick flights_refunder now", &names), Some("flights_refunder"));
        assert_eq!(parse_agent_name("reviewer or writer", &names), None);
        assert_eq!(parse_agent_name("", &names), None);
    }
}
