//! HTTP request handlers.
//!
//! `POST /:version/:service/:method` carries one request envelope in the body
//! and answers with one response envelope. Dispatch runs on the blocking pool,
//! at most `worker_pool_size` at a time, under the configured deadline.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use courier_core::{
    new_request_id, CourierError, Dispatcher, Result, RpcDefaults, RpcRequest, RpcResponse,
    RpcTarget,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// State shared across handlers.
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// One permit per worker; held until the method returns, even past the deadline
    pub workers: Arc<Semaphore>,
    /// Deadline for a single dispatch, including the wait for a worker
    pub request_timeout: Duration,
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Path((version, service, method)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let target = RpcTarget::new(service, method).with_version(version);

    let request = match RpcRequest::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed envelope for {}: {}", target, e);
            return internal_error(None);
        }
    };
    let request_id = request.header.request_id.clone();

    debug!("RPC call: {} [{}]", target, request_id);

    let job = run_on_worker(state.clone(), target.clone(), request);

    match tokio::time::timeout(state.request_timeout, job).await {
        Ok(Ok(response)) => envelope_response(StatusCode::OK, &response),
        Ok(Err(e)) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!("RPC error for {} [{}]: {}", target, request_id, e);
                return internal_error(Some(request_id));
            }
            debug!("RPC error for {} [{}]: {}", target, request_id, e);
            envelope_response(status, &RpcResponse::failure(request_id, e.to_string()))
        }
        Err(_) => {
            let err = CourierError::Timeout(state.request_timeout);
            warn!("RPC call {} [{}] exceeded {:?}", target, request_id, state.request_timeout);
            envelope_response(
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
                &RpcResponse::failure(request_id, timeout_message(state.request_timeout)),
            )
        }
    }
}

/// Wait for a worker permit, then dispatch on the blocking pool.
///
/// The permit moves into the blocking job, so a call abandoned by its deadline
/// keeps its worker until the method returns.
async fn run_on_worker(
    state: Arc<AppState>,
    target: RpcTarget,
    request: RpcRequest,
) -> Result<RpcResponse> {
    let permit = state
        .workers
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| CourierError::Internal(format!("Worker pool closed: {}", e)))?;
    let dispatcher = state.dispatcher.clone();

    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        dispatcher.dispatch(&target, &request)
    })
    .await
    .map_err(|e| CourierError::Internal(format!("Dispatch worker failed: {}", e)))?
}

/// Error text sent when a dispatch overruns its deadline.
pub fn timeout_message(timeout: Duration) -> String {
    format!("request timed out after {} ms", timeout.as_millis())
}

/// Generic failure envelope with HTTP 500.
///
/// Echoes `request_id` when the request got far enough to have one.
pub fn internal_error(request_id: Option<String>) -> Response {
    let request_id = request_id.unwrap_or_else(new_request_id);
    envelope_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &RpcResponse::failure(request_id, RpcDefaults::INTERNAL_ERROR_MESSAGE),
    )
}

/// Panic boundary for `CatchPanicLayer`.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    error!("RPC handler panicked: {}", detail);
    internal_error(None)
}

fn envelope_response(status: StatusCode, response: &RpcResponse) -> Response {
    match response.to_bytes() {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("Failed to encode response envelope: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                RpcDefaults::INTERNAL_ERROR_MESSAGE,
            )
                .into_response()
        }
    }
}
