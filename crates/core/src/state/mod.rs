//! State management for team runs.
//!
//! This module provides:
//! - The append-only transcript
//! - Run state machine logic
//! - RunManager for coordinating many concurrent runs

pub mod manager;
pub mod run;
pub mod transcript;

pub use manager::RunManager;
pub use run::RunState;
pub use transcript::Transcript;
