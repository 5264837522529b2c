//! Port vocabulary
//!
//! The prior authorization core reaches the partner API, the OAuth server,
//! and the clinical resource server only through port traits defined in the
//! domain crate. Every adapter behind those traits reports failure as a
//! [`PortError`].
//!
//! ```text
//!   ReviewEngine ──> ReviewTransport ──> partner REST API
//!                ──> TokenProvider   ──> OAuth server
//!                ──> ResourceLookup  ──> clinical resource server
//! ```

use thiserror::Error;

/// Failure reported by an external collaborator
///
/// A `PortError` means no usable answer was obtained. A partner that
/// answers with an error status is not a `PortError`; adapters return
/// that answer to the caller.
#[derive(Debug, Error)]
pub enum PortError {
    /// The collaborator could not be reached
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credentials were refused
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The collaborator is up but refusing work
    #[error("Service unavailable: {service}")]
    ServiceUnavailable { service: String },

    /// The adapter itself failed
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        PortError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn service_unavailable(service: impl Into<String>) -> Self {
        PortError::ServiceUnavailable {
            service: service.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if the same call may succeed later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. } | PortError::ServiceUnavailable { .. }
        )
    }
}

/// Marker for port traits: adapters must be shareable across tasks
pub trait DomainPort: Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(PortError::connection("reset by peer").is_transient());
        assert!(PortError::service_unavailable("partner-api").is_transient());
        assert!(!PortError::unauthorized("token expired").is_transient());
        assert!(!PortError::internal("lock poisoned").is_transient());
    }

    #[test]
    fn test_messages() {
        let err = PortError::service_unavailable("clinical-resource-server");
        assert_eq!(err.to_string(), "Service unavailable: clinical-resource-server");
        assert!(PortError::unauthorized("bad secret").to_string().contains("bad secret"));
    }
}
