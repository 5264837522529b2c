//! Prior authorization domain errors
//!
//! Mapping degradation (a field that cannot be derived) is never an error;
//! it is handled where it happens by substituting a default. The types here
//! cover the JSON boundary and the partner interaction only.

use serde_json::Value;
use thiserror::Error;

use core_kernel::{CoreError, PortError};
use crate::review::ReviewId;

/// Errors raised while turning untyped JSON into typed records
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Payload is not a JSON object (found {found})")]
    NotAnObject { found: &'static str },

    #[error("serviceReview envelope is not a JSON object (found {found})")]
    InvalidEnvelope { found: &'static str },

    #[error("Payload could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

impl MappingError {
    /// Names the JSON kind of a value for error messages
    pub(crate) fn kind_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Which stage of the workflow failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTier {
    Mapping,
    Submission,
    Polling,
}

/// Caller-facing errors for the submit/poll workflow
#[derive(Debug, Error)]
pub enum PriorAuthError {
    #[error("Mapping failed: {0}")]
    Mapping(#[from] MappingError),

    #[error("Submission rejected by partner with status {status_code}")]
    SubmissionRejected {
        status_code: u16,
        body: Value,
        validation_messages: Vec<String>,
    },

    #[error("Submission accepted with status {status_code} but no location reference was returned")]
    MissingLocation { status_code: u16, body: Value },

    #[error("Submission transport failure: {0}")]
    SubmissionTransport(#[source] PortError),

    #[error("Status fetch for review {review_id} failed with status {status_code}")]
    StatusRejected {
        review_id: ReviewId,
        status_code: u16,
        body: Value,
    },

    #[error("Status fetch for review {review_id} failed: {source}")]
    PollingTransport {
        review_id: ReviewId,
        #[source]
        source: PortError,
    },

    #[error("Polling for review {review_id} cancelled after {attempts} attempts")]
    Cancelled { review_id: ReviewId, attempts: u32 },

    #[error("Review {0} is not tracked")]
    UntrackedReview(ReviewId),

    #[error("Invalid review state: {0}")]
    State(#[from] CoreError),
}

impl PriorAuthError {
    /// Returns the workflow stage this error belongs to
    pub fn tier(&self) -> FailureTier {
        match self {
            PriorAuthError::Mapping(_) => FailureTier::Mapping,
            PriorAuthError::SubmissionRejected { .. }
            | PriorAuthError::MissingLocation { .. }
            | PriorAuthError::SubmissionTransport(_) => FailureTier::Submission,
            PriorAuthError::StatusRejected { .. }
            | PriorAuthError::PollingTransport { .. }
            | PriorAuthError::Cancelled { .. }
            | PriorAuthError::UntrackedReview(_)
            | PriorAuthError::State(_) => FailureTier::Polling,
        }
    }

    /// Returns the partner's HTTP status code, if the partner answered
    pub fn partner_status(&self) -> Option<u16> {
        match self {
            PriorAuthError::SubmissionRejected { status_code, .. }
            | PriorAuthError::MissingLocation { status_code, .. }
            | PriorAuthError::StatusRejected { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the partner's response body, if the partner answered
    pub fn partner_body(&self) -> Option<&Value> {
        match self {
            PriorAuthError::SubmissionRejected { body, .. }
            | PriorAuthError::MissingLocation { body, .. }
            | PriorAuthError::StatusRejected { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns true if this error came from a cancelled wait
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PriorAuthError::Cancelled { .. })
    }
}
