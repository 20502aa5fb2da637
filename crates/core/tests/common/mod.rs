//! Common test utilities shared by the integration tests.
//!
//! - Fixtures: agents, teams, gateways and project directories
//! - Assertions over run events

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
