//! # tk-core
//!
//! Multi-agent conversation engine for team-kit.
//!
//! A team is a set of agents sharing one transcript. On every turn a
//! selection strategy picks the next speaker, the speaker answers through a
//! model gateway (possibly after running tools), and a termination strategy
//! decides whether the run is over.
//!
//! ## Modules
//!
//! - [`config`]: Loading and validating the `.team-kit/` directory
//! - [`gateway`]: The model gateway seam plus scripted and closure gateways
//! - [`tools`]: Tool trait, registry, builtin tools and the tool executor
//! - [`agents`]: Agents, the roster of a team, and building agents from definitions
//! - [`engine`]: Orchestrator, selection and termination strategies, judges
//! - [`state`]: Transcript, run state transitions and the concurrent run manager
//! - [`init`]: Generating a starter `.team-kit/` directory

pub mod agents;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod init;
pub mod state;
pub mod tools;
