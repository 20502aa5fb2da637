//! Agent definition models for `.team-kit/agents/*.md`.
//!
//! This module defines the structure of agent definition files.
//! Agents are defined as Markdown files with YAML front matter.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Represents an agent's configuration and instruction.
///
/// Agents are defined in `.team-kit/agents/*.md` files with YAML front matter
/// containing metadata, and the file body containing the system instruction.
///
/// # Example
///
/// ```markdown
/// ---
/// name: flights_refunder
/// description: Refunds flights
/// model: gpt-4o
/// handoffs: [travel_agent, user]
/// tools: [refund_flight]
/// ---
///
/// You are an agent specialised in refunding flights.
/// You only need the booking reference to refund a flight.
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AgentDefinition {
    /// Unique identifier for this agent within a team.
    pub name: String,

    /// Human-readable description of the agent's purpose.
    ///
    /// Judges see this when choosing the next speaker.
    pub description: String,

    /// Model identifier handed to the model gateway (e.g., "gpt-4o").
    pub model: String,

    /// Agents (or `"user"`) this agent may hand the conversation to.
    #[serde(default)]
    pub handoffs: Vec<String>,

    /// Names of tools this agent may call.
    #[serde(default)]
    pub tools: Vec<String>,

    /// Display color hint for the CLI.
    ///
    /// Defaults to empty string if not specified.
    #[serde(default)]
    pub color: String,

    /// The main content of the .md file, not part of the front matter.
    ///
    /// This contains the system instruction that defines the agent's behavior.
    #[serde(skip)]
    pub instruction: String,
}

impl AgentDefinition {
    /// Whether this agent may hand off to `target`.
    pub fn can_handoff_to(&self, target: &str) -> bool {
        self.handoffs.iter().any(|h| h == target)
    }
}
