//! Request dispatch.
//!
//! Resolves a target against the registry, invokes the bound method and
//! produces the response envelope. Each call ends in exactly one of:
//!
//! - not found: failure envelope `"<version>.<service> not found"`
//! - decode failure: `Err(CourierError::Decode)`, the method is not invoked
//! - absent result: failure envelope `"null returned"`
//! - success: success envelope carrying the encoded result
//!
//! The response always echoes the request's `requestID`.

use crate::envelope::{RpcRequest, RpcResponse};
use crate::registry::ServiceRegistry;
use crate::target::RpcTarget;
use crate::{CourierError, Result};
use std::sync::Arc;
use tracing::debug;

/// Dispatches requests against a shared registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Run `request` against the method addressed by `target`.
    pub fn dispatch(&self, target: &RpcTarget, request: &RpcRequest) -> Result<RpcResponse> {
        let request_id = request.request_id();

        let record = match self.registry.lookup(target) {
            Ok(record) => record,
            Err(e) => {
                debug!("Dispatch {} [{}]: {}", target, request_id, e);
                return Ok(RpcResponse::failure(request_id, e.to_string()));
            }
        };

        match record.invoke(&request.payload)? {
            Some(payload) => {
                debug!(
                    "Dispatch {} [{}]: ok ({} bytes)",
                    target,
                    request_id,
                    payload.len()
                );
                Ok(RpcResponse::success(request_id, payload))
            }
            None => {
                debug!("Dispatch {} [{}]: no value", target, request_id);
                Ok(RpcResponse::failure(
                    request_id,
                    CourierError::NullReturned.to_string(),
                ))
            }
        }
    }
}
