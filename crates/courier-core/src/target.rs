//! Addressing for callable methods.

use crate::config::RpcDefaults;
use crate::{CourierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a callable by `(version, service, method)`.
///
/// The same value addresses a registry entry ([`RpcTarget::key`]) and builds
/// the routing path ([`RpcTarget::path`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RpcTarget {
    pub service: String,
    pub method: String,
    pub version: String,
}

impl RpcTarget {
    /// Target in the default `v1` namespace.
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            version: RpcDefaults::VERSION.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Registry key: `<version>.<service>.<method>`.
    pub fn key(&self) -> String {
        format!("{}.{}.{}", self.version, self.service, self.method)
    }

    /// Service qualifier used in not-found messages: `<version>.<service>`.
    pub fn qualifier(&self) -> String {
        format!("{}.{}", self.version, self.service)
    }

    /// Routing path: `/<version>/<service>/<method>`.
    pub fn path(&self) -> String {
        format!("/{}/{}/{}", self.version, self.service, self.method)
    }

    /// Reject targets that cannot be routed as three path segments.
    ///
    /// Segments are limited to URL-unreserved characters (`A-Z a-z 0-9 - . _ ~`)
    /// so the path needs no escaping.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("service", &self.service),
            ("method", &self.method),
            ("version", &self.version),
        ] {
            if value.is_empty() {
                return Err(CourierError::InvalidTarget {
                    message: format!("{} must not be empty", field),
                });
            }
            if let Some(c) = value.chars().find(|c| !is_unreserved(*c)) {
                return Err(CourierError::InvalidTarget {
                    message: format!(
                        "{} contains {:?}, which cannot appear in a path: {}",
                        field, c, value
                    ),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn not_found(&self) -> CourierError {
        CourierError::ServiceNotFound {
            version: self.version.clone(),
            service: self.service.clone(),
        }
    }
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

impl fmt::Display for RpcTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_version() {
        let target = RpcTarget::new("math.svc", "sum");
        assert_eq!(target.version, "v1");
        assert_eq!(target.key(), "v1.math.svc.sum");
        assert_eq!(target.path(), "/v1/math.svc/sum");
        assert_eq!(target.qualifier(), "v1.math.svc");
    }

    #[test]
    fn test_explicit_version() {
        let target = RpcTarget::new("math.svc", "sum").with_version("v2");
        assert_eq!(target.key(), "v2.math.svc.sum");
        assert_eq!(target.to_string(), "v2.math.svc.sum");
    }

    #[test]
    fn test_validate() {
        assert!(RpcTarget::new("math.svc", "sum").validate().is_ok());
        assert!(RpcTarget::new("", "sum").validate().is_err());
        assert!(RpcTarget::new("math.svc", "").validate().is_err());
        assert!(RpcTarget::new("math.svc", "sum")
            .with_version("")
            .validate()
            .is_err());
        assert!(RpcTarget::new("math/svc", "sum").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_url_reserved_characters() {
        for service in ["math?svc", "math#svc", "math%2Fsvc", "math svc", "mäth"] {
            let err = RpcTarget::new(service, "sum").validate().unwrap_err();
            assert!(matches!(err, CourierError::InvalidTarget { .. }), "{service}");
        }
        assert!(RpcTarget::new("math.svc", "sum?x=1").validate().is_err());
        assert!(RpcTarget::new("my-svc_2", "do~it").validate().is_ok());
    }

    #[test]
    fn test_not_found_uses_qualifier() {
        let err = RpcTarget::new("ghost.svc", "noop").not_found();
        assert_eq!(err.to_string(), "v1.ghost.svc not found");
    }
}
