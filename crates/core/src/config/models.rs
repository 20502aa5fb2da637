//! Configuration models that aggregate all settings.
//!
//! This module provides the unified `AppConfig` structure that combines
//! global settings, agent definitions, and team definitions into a
//! single configuration object.

use crate::config::error::{ConfigError, ConfigResult};
use crate::tools::ToolRegistry;
use std::collections::HashSet;
use tk_protocol::agent_models::AgentDefinition;
use tk_protocol::config_models::GlobalConfig;
use tk_protocol::message_models::USER_SENTINEL;
use tk_protocol::team_models::TeamDefinition;

/// Unified application configuration loaded from `.team-kit/` directory.
///
/// This structure aggregates all configuration sources:
/// - `config.toml`: Global settings
/// - `agents/*.md`: Agent definitions
/// - `teams/*.yaml`: Team definitions
///
/// # Example
///
/// ```rust,no_run
/// use tk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} agents and {} teams",
///          config.agents.len(),
///          config.teams.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// All agent definitions loaded from `agents/*.md`, sorted by name.
    pub agents: Vec<AgentDefinition>,

    /// All team definitions loaded from `teams/*.yaml`, sorted by name.
    pub teams: Vec<TeamDefinition>,
}

impl AppConfig {
    pub fn find_team(&self, name: &str) -> Option<&TeamDefinition> {
        self.teams.iter().find(|t| t.name == name)
    }

    pub fn find_agent(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Cross-check references between agents, teams and tools.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] listing every problem found:
    /// duplicate names, unknown agents in teams, unknown hand-off targets,
    /// unknown tools and zero limits.
    pub fn validate(&self, tools: &ToolRegistry) -> ConfigResult<()> {
        let mut problems = Vec::new();

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.name == USER_SENTINEL {
                problems.push(format!("agent name '{USER_SENTINEL}' is reserved"));
            }
            if !seen.insert(agent.name.as_str()) {
                problems.push(format!("duplicate agent '{}'", agent.name));
            }
            for tool in &agent.tools {
                if !tools.contains(tool) {
                    problems.push(format!("agent '{}' uses unknown tool '{}'", agent.name, tool));
                }
            }
            for target in &agent.handoffs {
                if target != USER_SENTINEL && self.find_agent(target).is_none() {
                    problems.push(format!(
                        "agent '{}' hands off to unknown agent '{}'",
                        agent.name, target
                    ));
                }
            }
        }

        let mut seen = HashSet::new();
        for team in &self.teams {
            if !seen.insert(team.name.as_str()) {
                problems.push(format!("duplicate team '{}'", team.name));
            }
            if team.agents.is_empty() {
                problems.push(format!("team '{}' has no agents", team.name));
            }
            if team.max_iterations == Some(0) {
                problems.push(format!("team '{}' sets max-iterations to 0", team.name));
            }
            if team.max_tool_rounds == Some(0) {
                problems.push(format!("team '{}' sets max-tool-rounds to 0", team.name));
            }
            for name in team.referenced_agents() {
                if self.find_agent(name).is_none() {
                    problems.push(format!(
                        "team '{}' references unknown agent '{}'",
                        team.name, name
                    ));
                } else if !team.agents.iter().any(|a| a == name) {
                    problems.push(format!(
                        "team '{}' references agent '{}' which is not in its agents list",
                        team.name, name
                    ));
                }
            }
            for name in &team.agents {
                let Some(agent) = self.find_agent(name) else {
                    continue;
                };
                for target in &agent.handoffs {
                    if target != USER_SENTINEL && !team.agents.contains(target) {
                        problems.push(format!(
                            "team '{}': agent '{}' hands off to '{}' which is not a member",
                            team.name, name, target
                        ));
                    }
                }
            }
        }

        if self.global.default_max_iterations == 0 {
            problems.push("default-max-iterations must be at least 1".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            problems.dedup();
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}
