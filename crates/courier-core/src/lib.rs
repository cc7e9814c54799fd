//! Courier Core - envelope protocol, service registry and dispatch.
//!
//! This crate holds everything about Courier RPC that does not depend on the
//! HTTP transport. The `courier-rpc` crate binds it to an axum server and a
//! reqwest client.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_core::{Dispatcher, Payload, RpcRequest, RpcTarget, ServiceBinding, ServiceRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ServiceRegistry::new());
//! registry
//!     .register_service("math.svc", "v1", ServiceBinding::transient(|| MathService))
//!     .method("sum", MathService::sum);
//!
//! let dispatcher = Dispatcher::new(registry);
//! let request = RpcRequest::new(Payload::encode(&AddRequest { x: 1, y: 2 })?);
//! let response = dispatcher.dispatch(&RpcTarget::new("math.svc", "sum"), &request)?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod target;

pub use config::{ClientConfig, RpcDefaults, ServerConfig};
pub use dispatcher::Dispatcher;
pub use envelope::{new_request_id, Header, Payload, RpcRequest, RpcResponse};
pub use error::{CourierError, Result};
pub use registry::{
    InstancePolicy, Record, ServiceBinding, ServiceBuilder, ServiceRecord, ServiceRegistry,
};
pub use target::RpcTarget;
