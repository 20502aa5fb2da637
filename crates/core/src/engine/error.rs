use crate::agents::{FactoryError, RosterError};
use crate::gateway::GatewayError;
use thiserror::Error;
use tk_protocol::run_models::RunStatus;
use uuid::Uuid;

/// Errors that end a run or prevent an orchestrator from being built.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Model gateway call for '{agent}' failed: {source}")]
    Gateway {
        agent: String,
        #[source]
        source: GatewayError,
    },

    #[error("Team has no agents")]
    NoAgents,

    #[error("Invalid team configuration: {0}")]
    InvalidConfig(String),

    #[error("Agent '{agent}' exceeded {limit} tool calls in a single turn")]
    ToolRoundsExceeded { agent: String, limit: u32 },

    #[error("Run {run_id} cannot be resumed from status {status:?}")]
    NotResumable { run_id: Uuid, status: RunStatus },

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Roster(#[from] RosterError),
}

impl EngineError {
    pub fn gateway(agent: &str, source: GatewayError) -> Self {
        Self::Gateway {
            agent: agent.to_string(),
            source,
        }
    }
}
