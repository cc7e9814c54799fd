//! Envelope wire types.
//!
//! Every request and response is a header plus an opaque payload:
//!
//! ```text
//! {"header":{"success":true,"error":"","requestID":"<uuid v7>"},"payload":"<base64>"}
//! ```
//!
//! The payload bytes are produced and consumed only by [`Payload::encode`] and
//! [`Payload::decode`] at the call edges; nothing in between looks inside.

use crate::{CourierError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Generate a globally unique, time-ordered request ID.
pub fn new_request_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub error: String,
    #[serde(rename = "requestID", default = "new_request_id")]
    pub request_id: String,
}

fn default_success() -> bool {
    true
}

impl Header {
    /// Fresh header for an outbound request.
    pub fn new() -> Self {
        Self {
            success: true,
            error: String::new(),
            request_id: new_request_id(),
        }
    }

    /// Success header echoing `request_id`.
    pub fn ok(request_id: impl Into<String>) -> Self {
        Self {
            success: true,
            error: String::new(),
            request_id: request_id.into(),
        }
    }

    /// Failure header echoing `request_id`.
    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            request_id: request_id.into(),
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque serialized bytes carried by an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(Bytes);

impl Payload {
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Serialize a typed value into payload bytes.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self(Bytes::from(bytes)))
    }

    /// Deserialize the payload bytes into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.0).map_err(CourierError::decode::<T>)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(|bytes| Payload(Bytes::from(bytes)))
            .map_err(serde::de::Error::custom)
    }
}

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub header: Header,
    #[serde(default)]
    pub payload: Payload,
}

impl RpcRequest {
    /// Wrap `payload` with a fresh header.
    pub fn new(payload: Payload) -> Self {
        Self {
            header: Header::new(),
            payload,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.header.request_id
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub header: Header,
    #[serde(default)]
    pub payload: Payload,
}

impl RpcResponse {
    pub fn success(request_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            header: Header::ok(request_id),
            payload,
        }
    }

    /// Failure response with an empty payload.
    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            header: Header::failure(request_id, error),
            payload: Payload::empty(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.header.success
    }

    /// Payload of a successful response, or the reported error as
    /// [`CourierError::Remote`].
    pub fn into_payload(self) -> Result<Payload> {
        if self.header.success {
            Ok(self.payload)
        } else {
            Err(CourierError::Remote {
                message: self.header.error,
            })
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct AddRequest {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_request_ids_are_unique_and_ordered() {
        let ids: Vec<String> = (0..256).map(|_| new_request_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn test_fresh_header() {
        let header = Header::new();
        assert!(header.success);
        assert!(header.error.is_empty());
        assert!(!header.request_id.is_empty());
    }

    #[test]
    fn test_header_wire_field_names() {
        let header = Header::failure("abc", "null returned");
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "null returned", "requestID": "abc"})
        );
    }

    #[test]
    fn test_payload_is_base64_on_the_wire() {
        let payload = Payload::encode(&AddRequest { x: 1, y: 2 }).unwrap();
        let request = RpcRequest {
            header: Header::ok("id-1"),
            payload,
        };
        let json: serde_json::Value = serde_json::from_slice(&request.to_bytes().unwrap()).unwrap();
        let encoded = json["payload"].as_str().unwrap();
        let raw = STANDARD.decode(encoded).unwrap();
        assert_eq!(raw, br#"{"x":1,"y":2}"#);
    }

    #[test]
    fn test_envelope_preserves_payload_bytes() {
        let payload = Payload::from_bytes(vec![0u8, 159, 146, 150, 255]);
        let request = RpcRequest::new(payload.clone());
        let parsed = RpcRequest::from_slice(&request.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.payload, payload);
        assert_eq!(parsed.request_id(), request.request_id());
    }

    #[test]
    fn test_payload_decode_schema_mismatch() {
        let payload = Payload::encode(&serde_json::json!({"data": "hello"})).unwrap();
        let err = payload.decode::<AddRequest>().unwrap_err();
        assert!(matches!(err, CourierError::Decode { .. }));
    }

    #[test]
    fn test_failure_response_into_payload() {
        let response = RpcResponse::failure("id-2", "v1.ghost.svc not found");
        assert!(response.payload.is_empty());
        match response.into_payload() {
            Err(CourierError::Remote { message }) => assert_eq!(message, "v1.ghost.svc not found"),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_header_fields_default_when_absent() {
        let request = RpcRequest::from_slice(br#"{"header":{},"payload":""}"#).unwrap();
        assert!(request.header.success);
        assert_eq!(request.header.error, "");
        assert!(!request.request_id().is_empty());

        let other = RpcRequest::from_slice(br#"{"header":{},"payload":""}"#).unwrap();
        assert_ne!(request.request_id(), other.request_id());
    }

    #[test]
    fn test_missing_payload_defaults_to_empty() {
        let response =
            RpcResponse::from_slice(br#"{"header":{"success":false,"error":"x","requestID":"1"}}"#)
                .unwrap();
        assert!(response.payload.is_empty());
        assert!(!response.is_success());
    }
}
