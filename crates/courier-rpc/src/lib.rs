//! Courier RPC - HTTP endpoints for the Courier core.
//!
//! The server routes `POST /{version}/{service}/{method}` into the dispatcher;
//! the client builds the same path from an [`RpcTarget`](courier_core::RpcTarget)
//! and decodes the typed result.

pub mod client;
pub mod demo;
pub mod handler;
pub mod server;

pub use client::{BlockingRpcClient, RpcClient};
pub use server::RpcServer;
