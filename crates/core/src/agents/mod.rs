//! Agents and the roster they form within a team.
//!
//! An [`Agent`] wraps a shared [`ModelGateway`](crate::gateway::ModelGateway)
//! together with its instruction, tools and permitted hand-off targets.
//! The [`AgentRoster`] holds the agents of one team and the
//! [`AgentFactory`] builds them from configuration.

pub mod base;
pub mod factory;
pub mod roster;

pub use base::Agent;
pub use factory::{AgentFactory, FactoryError};
pub use roster::{AgentRoster, RosterError};
