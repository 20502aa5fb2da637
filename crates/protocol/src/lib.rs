//! # tk-protocol
//!
//! Core protocol definitions and data models for team-kit.
//!
//! This crate defines all shared data structures used for:
//! - Conversation transcripts (messages, hand-offs, tool calls)
//! - Configuration file parsing (YAML teams, TOML config, Markdown agents)
//! - Runtime run status and the events emitted while a team runs
//!
//! ## Modules
//!
//! - [`message_models`]: Messages, roles, hand-off targets and tool calls
//! - [`tool_models`]: Tool schemas and argument validation
//! - [`agent_models`]: Agent definition structures
//! - [`team_models`]: Team definitions with selection and termination settings
//! - [`config_models`]: Global configuration from config.toml
//! - [`run_models`]: Run status and stop reasons
//! - [`events`]: Events emitted by the engine while a run progresses
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, uuid and chrono
//! - TypeScript generation: Wire types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other team-kit crates

pub mod agent_models;
pub mod config_models;
pub mod events;
pub mod message_models;
pub mod run_models;
pub mod team_models;
pub mod tool_models;

// Re-export all public types for convenience
pub use agent_models::*;
pub use config_models::*;
pub use events::*;
pub use message_models::*;
pub use run_models::*;
pub use team_models::*;
pub use tool_models::*;
