//! HTTP server implementation using Axum.
//!
//! # Thread Safety
//!
//! Each request is served on its own tokio task and dispatched on the blocking
//! pool. At most `worker_pool_size` methods run at once; a call that times out
//! keeps its worker until the method returns. The registry is shared via `Arc`
//! and may gain methods while the server runs.

use crate::handler::{handle_health, handle_panic, handle_rpc, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use courier_core::{
    CourierError, Dispatcher, Result, ServerConfig, ServiceBinding, ServiceBuilder,
    ServiceRegistry,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, OnceCell, Semaphore};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// RPC server owning one registry and at most one listener.
pub struct RpcServer {
    config: ServerConfig,
    registry: Arc<ServiceRegistry>,
    bound: OnceCell<SocketAddr>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    stopped: AtomicBool,
}

impl RpcServer {
    /// Create a server with an empty registry.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(ServiceRegistry::new()))
    }

    /// Create a server over an existing registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<ServiceRegistry>) -> Self {
        Self {
            config,
            registry,
            bound: OnceCell::new(),
            shutdown_tx: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Register methods of a service; see [`ServiceRegistry::register_service`].
    pub fn register_service<S>(
        &self,
        name: impl Into<String>,
        version: impl Into<String>,
        binding: ServiceBinding<S>,
    ) -> ServiceBuilder<'_, S>
    where
        S: Send + Sync + 'static,
    {
        self.registry.register_service(name, version, binding)
    }

    /// Build the router serving this server's registry.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            dispatcher: Dispatcher::new(self.registry.clone()),
            workers: Arc::new(Semaphore::new(self.config.worker_pool_size)),
            request_timeout: self.config.request_timeout,
        });

        Router::new()
            .route("/health", get(handle_health))
            .route("/:version/:service/:method", post(handle_rpc))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener and start serving in the background.
    ///
    /// Returns once the listener is bound, with the actual address (useful
    /// when port=0). Calling it again, concurrently or later, does not bind a
    /// second listener and returns the same address.
    ///
    /// Fails once the server has been shut down.
    pub async fn start(&self) -> Result<SocketAddr> {
        let addr = self.bound.get_or_try_init(|| self.bind()).await?;
        if self.is_stopped() {
            return Err(CourierError::Internal(format!(
                "RPC server on {} has been shut down",
                addr
            )));
        }
        Ok(*addr)
    }

    async fn bind(&self) -> Result<SocketAddr> {
        self.config.validate()?;

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| CourierError::Network {
                message: format!("Failed to bind {}: {}", bind_addr, e),
                cause: Some(e.to_string()),
            })?;
        let addr = listener.local_addr().map_err(|e| CourierError::Network {
            message: format!("Failed to read local address: {}", e),
            cause: Some(e.to_string()),
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        if let Ok(mut slot) = self.shutdown_tx.lock() {
            *slot = Some(shutdown_tx);
        }

        let app = self.router();
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("RPC server on {} failed: {}", addr, e);
            }
            info!("RPC server on {} stopped", addr);
        });

        info!(
            "RPC server listening on {} ({} methods, {} workers, {:?} timeout)",
            addr,
            self.registry.len(),
            self.config.worker_pool_size,
            self.config.request_timeout
        );
        for key in self.registry.keys() {
            info!("  {}", key);
        }

        Ok(addr)
    }

    /// Address of the bound listener, if started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.get().copied()
    }

    pub fn is_started(&self) -> bool {
        self.bound.initialized()
    }

    /// Whether [`RpcServer::shutdown`] has stopped a running listener.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop accepting connections and let in-flight requests finish.
    ///
    /// A stopped server is not restarted; a later [`RpcServer::start`] fails.
    pub fn shutdown(&self) {
        let sender = self.shutdown_tx.lock().ok().and_then(|mut slot| slot.take());
        if let Some(tx) = sender {
            self.stopped.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        }
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn local_config() -> ServerConfig {
        ServerConfig::default().with_host("127.0.0.1").with_port(0)
    }

    #[tokio::test]
    async fn test_server_starts() {
        let server = RpcServer::new(local_config());
        assert!(!server.is_started());

        let addr = server.start().await.unwrap();
        assert!(addr.port() > 0);
        assert_eq!(server.local_addr(), Some(addr));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let server = RpcServer::new(local_config());
        let first = server.start().await.unwrap();
        let second = server.start().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_start_after_shutdown_fails() {
        let server = RpcServer::new(local_config());
        let addr = server.start().await.unwrap();

        server.shutdown();
        assert!(server.is_stopped());

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, CourierError::Internal(_)));
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_noop() {
        let server = RpcServer::new(local_config());
        server.shutdown();
        assert!(!server.is_stopped());
        assert!(server.start().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_start() {
        let server = RpcServer::new(local_config().with_worker_pool_size(0));
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, CourierError::Config { .. }));
        assert!(!server.is_started());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let server = RpcServer::new(local_config());
        let addr = server.start().await.unwrap();

        let other = RpcServer::new(local_config().with_port(addr.port()));
        let err = other.start().await.unwrap_err();
        assert!(matches!(err, CourierError::Network { .. }));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = RpcServer::new(
            local_config().with_request_timeout(Duration::from_millis(500)),
        );
        let addr = server.start().await.unwrap();

        let body: serde_json::Value = reqwest::get(format!("http://{}/health", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({"status": "ok"}));
    }
}
