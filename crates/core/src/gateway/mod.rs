//! Model gateway abstraction.
//!
//! Agents and judges never talk to a model provider directly; they go
//! through a [`ModelGateway`]. Only deterministic gateways ship with the
//! crate: [`ScriptedGateway`] for replaying canned responses and
//! [`FnGateway`] for computing them from the request.

pub mod base;
pub mod closure;
pub mod scripted;

pub use base::{GatewayError, GatewayRequest, GatewayResponse, ModelGateway};
pub use closure::FnGateway;
pub use scripted::{GatewayScript, ScriptStep, ScriptedGateway};
