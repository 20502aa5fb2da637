//! Runtime run state models.
//!
//! This module defines the lifecycle status of a team run and the reasons a
//! run can stop.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Represents the current lifecycle status of a run.
///
/// The status progresses through these states during normal execution:
/// Pending -> Running -> Satisfied
///
/// Special states:
/// - AwaitingUser: an agent handed off to the user; the run can be resumed
/// - CeilingReached: the iteration ceiling cut the run short
/// - Cancelled: the caller cancelled the run
/// - Failed: the model gateway or the engine reported an error
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run has been created but not started yet.
    Pending,

    /// Run is actively taking turns.
    Running,

    /// Suspended until the external user replies.
    AwaitingUser,

    /// A stop condition was met.
    Satisfied,

    /// The iteration ceiling was reached before any stop condition.
    CeilingReached,

    /// Cancelled by the caller between or during turns.
    Cancelled,

    /// Ended because of an error.
    Failed,
}

impl RunStatus {
    /// Whether the run can no longer make progress.
    ///
    /// `AwaitingUser` is not terminal: the run resumes once the user answers.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Satisfied | Self::CeilingReached | Self::Cancelled | Self::Failed
        )
    }

    /// Whether the run stopped because a stop condition was met.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Why a run stopped (or suspended).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// The last message contained the configured marker.
    Keyword { marker: String },

    /// An agent handed the conversation to the user.
    HandoffToUser,

    /// An agent answered with plain text.
    TextReply,

    /// A judge classified the last message as satisfactory.
    JudgeSatisfied,

    /// The configured turn limit was reached.
    IterationCap { max: u32 },

    /// Selection found nobody to speak next.
    NoNextAgent,
}

impl StopReason {
    /// The run status a stop with this reason leads to.
    pub fn status(&self) -> RunStatus {
        match self {
            Self::HandoffToUser => RunStatus::AwaitingUser,
            Self::IterationCap { .. } => RunStatus::CeilingReached,
            _ => RunStatus::Satisfied,
        }
    }
}
