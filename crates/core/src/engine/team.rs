//! Builds orchestrators from team definitions.

use crate::agents::{AgentFactory, AgentRoster};
use crate::engine::error::EngineError;
use crate::engine::judge::{Judge, DEFAULT_SELECTION_PROMPT, DEFAULT_TERMINATION_PROMPT};
use crate::engine::selection::{FixedOrder, HandoffSelection, JudgeSelection, SelectionStrategy};
use crate::engine::termination::{
    AnyOf, HandoffToUserTermination, IterationCap, JudgeTermination, KeywordTermination,
    TerminationStrategy, TextReplyTermination,
};
use crate::engine::{Orchestrator, RunConfig, DEFAULT_MAX_TOOL_ROUNDS};
use crate::gateway::ModelGateway;
use crate::tools::ToolRegistry;
use std::sync::Arc;
use tk_protocol::agent_models::AgentDefinition;
use tk_protocol::config_models::GlobalConfig;
use tk_protocol::team_models::{SelectionConfig, TeamDefinition, TerminationConfig};

const SELECTION_JUDGE: &str = "selection-judge";
const TERMINATION_JUDGE: &str = "termination-judge";

/// Assembles an [`Orchestrator`] from configuration.
pub struct TeamBuilder<'a> {
    agents: &'a [AgentDefinition],
    gateway: Arc<dyn ModelGateway>,
    tools: &'a ToolRegistry,
    global: GlobalConfig,
}

impl<'a> TeamBuilder<'a> {
    pub fn new(
        agents: &'a [AgentDefinition],
        gateway: Arc<dyn ModelGateway>,
        tools: &'a ToolRegistry,
    ) -> Self {
        Self {
            agents,
            gateway,
            tools,
            global: GlobalConfig::default(),
        }
    }

    pub fn with_global(mut self, global: GlobalConfig) -> Self {
        self.global = global;
        self
    }

    /// Build the orchestrator for `team`.
    ///
    /// # Errors
    ///
    /// Returns an error if the team references unknown agents or tools,
    /// or if its limits are invalid.
    pub fn build(&self, team: &TeamDefinition) -> Result<Orchestrator, EngineError> {
        let roster = self.roster(team)?;

        for name in team.referenced_agents() {
            if !roster.contains(name) {
                return Err(EngineError::InvalidConfig(format!(
                    "team '{}' references agent '{}' which is not in its agents list",
                    team.name, name
                )));
            }
        }

        let selection = self.selection(team, &roster);
        let termination = self.termination(team, &roster);

        let config = RunConfig {
            max_iterations: team
                .max_iterations
                .unwrap_or(self.global.default_max_iterations),
            history_window: team.history_window.or(self.global.history_window),
            default_agent: team.default_agent.clone(),
            max_tool_rounds: team.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS),
        };

        Orchestrator::new(team.name.clone(), roster, selection, termination, config)
    }

    fn roster(&self, team: &TeamDefinition) -> Result<AgentRoster, EngineError> {
        let mut roster = AgentRoster::new();
        for name in &team.agents {
            let definition = self
                .agents
                .iter()
                .find(|a| &a.name == name)
                .ok_or_else(|| {
                    EngineError::InvalidConfig(format!(
                        "team '{}' references unknown agent '{}'",
                        team.name, name
                    ))
                })?;
            roster.add(AgentFactory::create(
                definition,
                Arc::clone(&self.gateway),
                self.tools,
            )?)?;
        }
        Ok(roster)
    }

    /// Judges default to the model of this agent.
    fn judge_model(&self, roster: &AgentRoster, preferred: &str) -> String {
        roster
            .get(preferred)
            .or_else(|| roster.first())
            .map(|a| a.model().to_string())
            .unwrap_or_default()
    }

    fn selection(&self, team: &TeamDefinition, roster: &AgentRoster) -> Arc<dyn SelectionStrategy> {
        match &team.selection {
            SelectionConfig::FixedOrder { order } => Arc::new(FixedOrder::new(order.clone())),
            SelectionConfig::Handoff {
                initial,
                on_no_handoff,
            } => Arc::new(
                HandoffSelection::new(initial.clone(), *on_no_handoff)
                    .with_default_agent(team.default_agent.clone()),
            ),
            SelectionConfig::Judge {
                initial,
                fallback,
                model,
                prompt,
                history_window,
            } => {
                let judge = Judge::new(
                    SELECTION_JUDGE,
                    Arc::clone(&self.gateway),
                    model
                        .clone()
                        .unwrap_or_else(|| self.judge_model(roster, initial)),
                    prompt
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SELECTION_PROMPT.to_string()),
                )
                .with_history_window(history_window.or(team.history_window));
                Arc::new(JudgeSelection::new(judge, initial.clone(), fallback.clone()))
            }
        }
    }

    fn termination(
        &self,
        team: &TeamDefinition,
        roster: &AgentRoster,
    ) -> Arc<dyn TerminationStrategy> {
        let initial = match &team.selection {
            SelectionConfig::Handoff { initial, .. } | SelectionConfig::Judge { initial, .. } => {
                initial.as_str()
            }
            SelectionConfig::FixedOrder { .. } => "",
        };

        let conditions = team
            .termination
            .iter()
            .map(|condition| -> Arc<dyn TerminationStrategy> {
                match condition {
                    TerminationConfig::Keyword {
                        marker,
                        case_sensitive,
                    } => Arc::new(
                        KeywordTermination::new(marker.clone()).case_sensitive(*case_sensitive),
                    ),
                    TerminationConfig::HandoffToUser => Arc::new(HandoffToUserTermination),
                    TerminationConfig::TextReply => Arc::new(TextReplyTermination),
                    TerminationConfig::IterationCap { max } => Arc::new(IterationCap::new(*max)),
                    TerminationConfig::Judge {
                        keyword,
                        model,
                        prompt,
                        agents,
                        history_window,
                    } => {
                        let prompt = prompt
                            .clone()
                            .unwrap_or_else(|| DEFAULT_TERMINATION_PROMPT.to_string());
                        let judge = Judge::new(
                            TERMINATION_JUDGE,
                            Arc::clone(&self.gateway),
                            model
                                .clone()
                                .unwrap_or_else(|| self.judge_model(roster, initial)),
                            prompt,
                        )
                        .with_history_window(history_window.or(team.history_window));
                        Arc::new(
                            JudgeTermination::new(judge, keyword.clone()).for_agents(agents.clone()),
                        )
                    }
                }
            })
            .collect();

        Arc::new(AnyOf::new(conditions))
    }
}
