//! Run events.
//!
//! The engine reports progress as a stream of [`RunEvent`]s sent over a
//! channel, so that a CLI or UI can render a run while it is in flight.
//!
//! Uses tagged enum serialization for TypeScript compatibility:
//! ```json
//! {
//!   "type": "turnStarted",
//!   "payload": {
//!     "run_id": "uuid-here",
//!     "turn": 2,
//!     "agent": "writer"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::message_models::Message;
use crate::run_models::{RunStatus, StopReason};

/// Events sent from the engine to whoever observes a run.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum RunEvent {
    /// A new run has been started.
    RunStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        team: String,
    },

    /// An agent has been selected and is about to act.
    TurnStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        turn: u32,
        agent: String,
    },

    /// A message was appended to the transcript.
    MessageAppended {
        #[ts(type = "string")]
        run_id: Uuid,
        index: usize,
        message: Message,
    },

    /// Selection named an agent that could not be used; the fallback acts instead.
    SelectionFallback {
        #[ts(type = "string")]
        run_id: Uuid,
        requested: Option<String>,
        fallback: String,
        reason: String,
    },

    /// A tool call failed; the failure was reported back to the agent.
    ToolFailed {
        #[ts(type = "string")]
        run_id: Uuid,
        agent: String,
        tool: String,
        error: String,
    },

    /// The run is waiting for the external user.
    RunSuspended {
        #[ts(type = "string")]
        run_id: Uuid,
        /// Agent that handed off to the user; the user's reply goes back to it.
        agent: String,
    },

    /// The run reached a terminal status.
    RunFinished {
        #[ts(type = "string")]
        run_id: Uuid,
        status: RunStatus,
        reason: Option<StopReason>,
        turns: u32,
    },

    /// The run ended with an error.
    RunFailed {
        #[ts(type = "string")]
        run_id: Uuid,
        error: String,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::TurnStarted { run_id, .. }
            | Self::MessageAppended { run_id, .. }
            | Self::SelectionFallback { run_id, .. }
            | Self::ToolFailed { run_id, .. }
            | Self::RunSuspended { run_id, .. }
            | Self::RunFinished { run_id, .. }
            | Self::RunFailed { run_id, .. } => *run_id,
        }
    }

    /// Whether no further events will follow for this run (until it is resumed).
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::RunFinished { .. } | Self::RunFailed { .. } | Self::RunSuspended { .. }
        )
    }
}
