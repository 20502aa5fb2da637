//! The set of agents taking part in one team.

use crate::agents::base::Agent;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tk_protocol::message_models::{HandoffTarget, USER_SENTINEL};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("Duplicate agent name: {0}")]
    DuplicateAgent(String),
    #[error("'{0}' is reserved for the external user and cannot name an agent")]
    ReservedName(String),
    #[error("Agent '{agent}' may hand off to unknown agent '{target}'")]
    UnknownHandoffTarget { agent: String, target: String },
}

/// Agents by unique name, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    agents: Vec<Arc<Agent>>,
    index: HashMap<String, usize>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from agents in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::DuplicateAgent`] if two agents share a name,
    /// [`RosterError::ReservedName`] if an agent is called `"user"`.
    pub fn from_agents(agents: impl IntoIterator<Item = Agent>) -> Result<Self, RosterError> {
        let mut roster = Self::new();
        for agent in agents {
            roster.add(agent)?;
        }
        Ok(roster)
    }

    /// Add an agent at the end of the declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::DuplicateAgent`] if the name is already taken,
    /// [`RosterError::ReservedName`] for the user sentinel.
    pub fn add(&mut self, agent: Agent) -> Result<(), RosterError> {
        if agent.name() == USER_SENTINEL {
            return Err(RosterError::ReservedName(agent.name().to_string()));
        }
        if self.index.contains_key(agent.name()) {
            return Err(RosterError::DuplicateAgent(agent.name().to_string()));
        }
        self.index.insert(agent.name().to_string(), self.agents.len());
        self.agents.push(Arc::new(agent));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Agent>> {
        self.index.get(name).map(|&i| &self.agents[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    pub fn first(&self) -> Option<&Arc<Agent>> {
        self.agents.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// One `name: description` line per agent, used in judge prompts.
    pub fn describe(&self) -> String {
        self.agents
            .iter()
            .map(|a| {
                if a.description().is_empty() {
                    a.name().to_string()
                } else {
                    format!("{}: {}", a.name(), a.description())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check that every permitted hand-off names a roster member or the user.
    ///
    /// # Errors
    ///
    /// Returns the first [`RosterError::UnknownHandoffTarget`] found.
    pub fn validate_handoffs(&self) -> Result<(), RosterError> {
        for agent in &self.agents {
            for target in agent.handoffs() {
                if let HandoffTarget::Agent(name) = target {
                    if !self.contains(name) {
                        return Err(RosterError::UnknownHandoffTarget {
                            agent: agent.name().to_string(),
                            target: name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Render the hand-off graph in Graphviz DOT format.
    ///
    /// Agents are boxes, tools are ellipses and the user is a double circle.
    pub fn handoff_graph_dot(&self, title: &str) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph \"{}\" {{", escape(title));
        let _ = writeln!(dot, "    rankdir=LR;");

        let mut has_user = false;
        for agent in &self.agents {
            let _ = writeln!(
                dot,
                "    \"{}\" [shape=box, style=filled, fillcolor=lightyellow];",
                escape(agent.name())
            );
            has_user |= agent.handoffs().iter().any(HandoffTarget::is_user);
        }
        if has_user {
            let _ = writeln!(dot, "    \"user\" [shape=doublecircle];");
        }

        for agent in &self.agents {
            for schema in agent.tool_schemas() {
                let tool_node = format!("{}::{}", agent.name(), schema.name);
                let _ = writeln!(
                    dot,
                    "    \"{}\" [label=\"{}\", shape=ellipse, fillcolor=lightgreen, style=filled];",
                    escape(&tool_node),
                    escape(&schema.name)
                );
                let _ = writeln!(
                    dot,
                    "    \"{}\" -> \"{}\" [style=dotted];",
                    escape(agent.name()),
                    escape(&tool_node)
                );
            }
            for target in agent.handoffs() {
                let _ = writeln!(
                    dot,
                    "    \"{}\" -> \"{}\";",
                    escape(agent.name()),
                    escape(target.as_str())
                );
            }
        }

        dot.push_str("}\n");
        dot
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
