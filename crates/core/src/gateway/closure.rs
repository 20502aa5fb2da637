//! Gateway backed by a plain closure.

use crate::gateway::base::{GatewayError, GatewayRequest, GatewayResponse, ModelGateway};
use async_trait::async_trait;

type Responder = dyn Fn(&GatewayRequest) -> Result<GatewayResponse, GatewayError> + Send + Sync;

/// Wraps a synchronous function as a [`ModelGateway`].
///
/// Useful when a response depends on the request, e.g. echoing the last
/// tool result back as the final answer.
pub struct FnGateway {
    responder: Box<Responder>,
}

impl FnGateway {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&GatewayRequest) -> Result<GatewayResponse, GatewayError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
        }
    }
}

#[async_trait]
impl ModelGateway for FnGateway {
    async fn complete(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        (self.responder)(request)
    }
}
