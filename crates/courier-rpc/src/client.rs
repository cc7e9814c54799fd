//! HTTP client endpoint.
//!
//! [`RpcClient`] sends one request envelope per call over a pooled reqwest
//! client and waits for the response under a bounded deadline. Three failure
//! causes stay distinct:
//!
//! - the wait expired: [`CourierError::Timeout`]
//! - the transport failed: [`CourierError::Network`] / [`CourierError::HttpStatus`]
//! - the server answered with a failure header: [`CourierError::Remote`]
//!
//! [`BlockingRpcClient`] wraps the same call for synchronous callers.

use courier_core::{
    ClientConfig, CourierError, Payload, Result, RpcRequest, RpcResponse, RpcTarget,
};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Async RPC client.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    config: ClientConfig,
    base_url: String,
}

impl RpcClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .tcp_nodelay(true)
            .user_agent("Courier-RPC/1.0")
            .build()
            .map_err(|e| CourierError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call `target` with `payload`, waiting up to the configured timeout.
    pub async fn invoke<Req, Resp>(&self, target: &RpcTarget, payload: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.invoke_with_timeout(target, payload, self.config.timeout)
            .await
    }

    /// Call `target` with `payload`, waiting up to `timeout`.
    ///
    /// The deadline only stops the wait; the server may still run the method.
    pub async fn invoke_with_timeout<Req, Resp>(
        &self,
        target: &RpcTarget,
        payload: &Req,
        timeout: Duration,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        target.validate()?;
        let request = RpcRequest::new(Payload::encode(payload)?);

        let response = match tokio::time::timeout(timeout, self.send(target, &request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "RPC call {} [{}] timed out after {:?}",
                    target,
                    request.request_id(),
                    timeout
                );
                return Err(CourierError::Timeout(timeout));
            }
        };

        if response.header.request_id != request.header.request_id {
            warn!(
                "RPC call {}: response request ID {} does not match {}",
                target,
                response.header.request_id,
                request.request_id()
            );
        }

        response.into_payload()?.decode()
    }

    async fn send(&self, target: &RpcTarget, request: &RpcRequest) -> Result<RpcResponse> {
        let url = format!("{}{}", self.base_url, target.path());
        let body = request.to_bytes()?;

        debug!("POST {} [{}]", url, request.request_id());

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| CourierError::Network {
                message: format!("POST {} failed: {}", url, e),
                cause: Some(e.to_string()),
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| CourierError::Network {
            message: format!("Failed to read response from {}: {}", url, e),
            cause: Some(e.to_string()),
        })?;

        match RpcResponse::from_slice(&bytes) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(CourierError::HttpStatus {
                status: status.as_u16(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Synchronous RPC client.
///
/// Owns a small tokio runtime; each call blocks the calling thread until the
/// response arrives, the transport fails, or the timeout elapses. Must not be
/// used from inside an async context.
pub struct BlockingRpcClient {
    runtime: tokio::runtime::Runtime,
    inner: RpcClient,
}

impl BlockingRpcClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("courier-client")
            .enable_all()
            .build()
            .map_err(|e| CourierError::Internal(format!("Failed to start client runtime: {}", e)))?;
        let inner = RpcClient::new(config)?;

        Ok(Self { runtime, inner })
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.config()
    }

    /// Blocking form of [`RpcClient::invoke`].
    pub fn invoke<Req, Resp>(&self, target: &RpcTarget, payload: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.runtime.block_on(self.inner.invoke(target, payload))
    }

    /// Blocking form of [`RpcClient::invoke_with_timeout`].
    pub fn invoke_with_timeout<Req, Resp>(
        &self,
        target: &RpcTarget,
        payload: &Req,
        timeout: Duration,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.runtime
            .block_on(self.inner.invoke_with_timeout(target, payload, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping {
        n: u32,
    }

    #[tokio::test]
    async fn test_invalid_target_fails_before_sending() {
        let client = RpcClient::new(ClientConfig::default().with_port(1)).unwrap();
        let result: Result<Ping> = client
            .invoke(&RpcTarget::new("", "ping"), &Ping { n: 1 })
            .await;
        assert!(matches!(result, Err(CourierError::InvalidTarget { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let client = RpcClient::new(
            ClientConfig::default()
                .with_host("127.0.0.1")
                .with_port(1),
        )
        .unwrap();
        let result: Result<Ping> = client
            .invoke(&RpcTarget::new("ping.svc", "ping"), &Ping { n: 1 })
            .await;
        match result {
            Err(e @ CourierError::Network { .. }) => assert!(e.is_retryable()),
            other => panic!("Expected network error, got: {:?}", other),
        }
    }

    #[test]
    fn test_blocking_client_keeps_config() {
        let config = ClientConfig::default().with_timeout(Duration::from_millis(250));
        let client = BlockingRpcClient::new(config.clone()).unwrap();
        assert_eq!(client.config(), &config);
    }
}
