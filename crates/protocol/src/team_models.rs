//! Team configuration models for `.team-kit/teams/*.yaml`.
//!
//! A team names the agents that share one conversation and declares how
//! the next speaker is chosen and when the conversation stops.

use serde::{Deserialize, Serialize};

/// What hand-off-directed selection does when the last turn was not a hand-off.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NoHandoffPolicy {
    /// The agent that spoke last keeps the floor.
    #[default]
    Stay,
    /// Route to the team's default agent.
    Default,
    /// End the run.
    End,
}

/// How the next speaker is chosen.
///
/// Tagged by the `strategy` key:
///
/// ```yaml
/// selection:
///   strategy: judge
///   initial: reviewer
///   fallback: writer
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum SelectionConfig {
    /// Cycle through `order` (or the team's agent list when empty).
    FixedOrder {
        #[serde(default)]
        order: Vec<String>,
    },

    /// Follow the target of the most recent hand-off.
    Handoff {
        initial: String,
        #[serde(default)]
        on_no_handoff: NoHandoffPolicy,
    },

    /// Ask a judge model which participant speaks next.
    Judge {
        initial: String,
        fallback: String,
        /// Model used for the judge call; defaults to the initial agent's model.
        #[serde(default)]
        model: Option<String>,
        /// Prompt template; `{{participants}}` and `{{lastmessage}}` are substituted.
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        history_window: Option<usize>,
    },
}

/// A single stop condition. A team's conditions are combined with logical OR.
///
/// Tagged by the `condition` key:
///
/// ```yaml
/// termination:
///   - condition: keyword
///     marker: TERMINATE
///   - condition: handoff-to-user
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "condition", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum TerminationConfig {
    /// Stop when the last message contains `marker`.
    Keyword {
        marker: String,
        #[serde(default)]
        case_sensitive: bool,
    },

    /// Suspend when an agent hands off to the user.
    HandoffToUser,

    /// Stop once an agent answers with plain text instead of a hand-off.
    TextReply,

    /// Ask a judge model whether the last message is satisfactory.
    Judge {
        /// Word the judge answers with when satisfied.
        keyword: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        prompt: Option<String>,
        /// Only judge messages authored by these agents (all when empty).
        #[serde(default)]
        agents: Vec<String>,
        #[serde(default)]
        history_window: Option<usize>,
    },

    /// Stop after `max` turns.
    IterationCap { max: u32 },
}

/// Defines a full team: its agents, selection and termination.
///
/// # Example
///
/// ```yaml
/// name: travel-desk
/// description: Swarm with a refund specialist
/// agents:
///   - travel_agent
///   - flights_refunder
/// selection:
///   strategy: handoff
///   initial: travel_agent
/// termination:
///   - condition: handoff-to-user
///   - condition: keyword
///     marker: TERMINATE
/// max-iterations: 12
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TeamDefinition {
    /// Unique name identifying this team.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Names of the participating agents, in declaration order.
    pub agents: Vec<String>,

    pub selection: SelectionConfig,

    /// Stop conditions, combined with logical OR.
    #[serde(default)]
    pub termination: Vec<TerminationConfig>,

    /// Turn ceiling; falls back to the global default when absent.
    #[serde(default)]
    pub max_iterations: Option<u32>,

    /// Number of most recent messages each agent sees.
    #[serde(default)]
    pub history_window: Option<usize>,

    /// Agent used when selection cannot be resolved; the first agent when absent.
    #[serde(default)]
    pub default_agent: Option<String>,

    /// Maximum tool calls an agent may chain within a single turn.
    #[serde(default)]
    pub max_tool_rounds: Option<u32>,
}

impl TeamDefinition {
    /// Every agent name this team references (agents list, selection and
    /// termination settings), used for cross-checking against loaded agents.
    pub fn referenced_agents(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.iter().map(String::as_str).collect();

        match &self.selection {
            SelectionConfig::FixedOrder { order } => names.extend(order.iter().map(String::as_str)),
            SelectionConfig::Handoff { initial, .. } => names.push(initial),
            SelectionConfig::Judge {
                initial, fallback, ..
            } => {
                names.push(initial);
                names.push(fallback);
            }
        }

        for condition in &self.termination {
            if let TerminationConfig::Judge { agents, .. } = condition {
                names.extend(agents.iter().map(String::as_str));
            }
        }

        if let Some(default_agent) = &self.default_agent {
            names.push(default_agent);
        }

        names
    }
}
