//! Demo SHA-256 service served by the `courier-rpc` binary.

use courier_core::{record, RpcTarget, ServiceBinding, ServiceRegistry};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const SERVICE_NAME: &str = "sha.svc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaRequest {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaResponse {
    pub sha: String,
}

record!(ShaRequest, ShaResponse);

/// Stateless hashing service; registered transient.
#[derive(Debug, Default)]
pub struct ShaService;

impl ShaService {
    pub fn sha(&self, request: ShaRequest) -> ShaResponse {
        ShaResponse {
            sha: hex::encode(Sha256::digest(request.data.as_bytes())),
        }
    }
}

/// Register `sha.svc` in `registry` under `version`.
pub fn register(registry: &ServiceRegistry, version: &str) -> usize {
    registry
        .register_service(SERVICE_NAME, version, ServiceBinding::transient(|| ShaService))
        .method("sha", ShaService::sha)
        .inserted()
}

/// Target of the demo `sha` method in the default version.
pub fn sha_target() -> RpcTarget {
    RpcTarget::new(SERVICE_NAME, "sha")
}
