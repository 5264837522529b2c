//! Review request state
//!
//! A [`ReviewRequestState`] is created on accepted submission and mutated
//! only by the polling loop. Once terminal it rejects further updates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use core_kernel::CoreError;

use crate::status::{normalize, InternalStatus};

/// Partner-assigned review identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(String);

impl ReviewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extracts the id from a `Location` reference (its last path segment)
    pub fn from_location(location: &str) -> Option<Self> {
        let path = location
            .trim()
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let id = path.rsplit('/').next().unwrap_or_default().trim();
        if id.is_empty() {
            None
        } else {
            Some(Self(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A partner status reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReason {
    pub code: Option<String>,
    pub value: Option<String>,
}

/// One normalized status fetch, carrying the raw partner response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub review_id: ReviewId,
    pub status: InternalStatus,
    pub raw_code: String,
    pub raw_text: String,
    pub status_reasons: Vec<StatusReason>,
    pub validation_messages: Vec<String>,
    pub http_status: u16,
    pub raw_response: Value,
    pub fetched_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Normalizes a partner status body
    ///
    /// `statusCode` may be a string or a number. Missing code and text
    /// become `"unknown"` and `"Unknown"`.
    pub fn from_body(review_id: ReviewId, http_status: u16, body: Value) -> Self {
        let raw_code = scalar(body.get("statusCode")).unwrap_or_else(|| "unknown".to_string());
        let raw_text = scalar(body.get("status")).unwrap_or_else(|| "Unknown".to_string());
        let status = normalize(&raw_code, &raw_text);

        let status_reasons: Vec<StatusReason> = body
            .get("statusReasons")
            .and_then(Value::as_array)
            .map(|reasons| {
                reasons
                    .iter()
                    .map(|r| StatusReason {
                        code: scalar(r.get("code")),
                        value: scalar(r.get("value")),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let validation_messages = validation_messages(&body);

        for reason in &status_reasons {
            info!(
                review_id = %review_id,
                code = reason.code.as_deref().unwrap_or("-"),
                value = reason.value.as_deref().unwrap_or("-"),
                "Partner status reason"
            );
        }
        for message in &validation_messages {
            warn!(review_id = %review_id, message = %message, "Partner validation message");
        }

        Self {
            review_id,
            status,
            raw_code,
            raw_text,
            status_reasons,
            validation_messages,
            http_status,
            raw_response: body,
            fetched_at: Utc::now(),
        }
    }
}

/// Extracts `validationMessages` from a partner body
///
/// Entries may be plain strings or objects with a `errorMessage`/`message`
/// field.
pub fn validation_messages(body: &Value) -> Vec<String> {
    body.get("validationMessages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| match m {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(_) => scalar(m.get("errorMessage"))
                        .or_else(|| scalar(m.get("message")))
                        .or_else(|| Some(m.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Tracking state of one submitted review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestState {
    pub id: ReviewId,
    pub internal_status: InternalStatus,
    pub attempts: u32,
    pub last_raw_response: Option<Value>,
    pub submitted_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
}

impl ReviewRequestState {
    /// Creates the state of a freshly accepted review
    pub fn new(id: ReviewId) -> Self {
        Self {
            id,
            internal_status: InternalStatus::InProcess,
            attempts: 0,
            last_raw_response: None,
            submitted_at: Utc::now(),
            last_polled_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.internal_status.is_terminal()
    }

    /// Applies one status fetch
    pub fn record(&mut self, snapshot: &StatusSnapshot) -> Result<(), CoreError> {
        self.ensure_open(snapshot.status.code())?;
        if snapshot.review_id != self.id {
            return Err(CoreError::validation(format!(
                "snapshot for review {} applied to review {}",
                snapshot.review_id, self.id
            )));
        }

        self.attempts = self.attempts.saturating_add(1);
        self.internal_status = snapshot.status.clone();
        self.last_raw_response = Some(snapshot.raw_response.clone());
        self.last_polled_at = Some(snapshot.fetched_at);
        Ok(())
    }

    /// Marks the review as abandoned by the poller
    pub fn mark_poll_timeout(&mut self) -> Result<(), CoreError> {
        self.ensure_open(InternalStatus::PollTimeout.code())?;
        self.internal_status = InternalStatus::PollTimeout;
        Ok(())
    }

    fn ensure_open(&self, to: &str) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::invalid_state(format!(
                "review {} is terminal at {}, cannot move to {}",
                self.id,
                self.internal_status.code(),
                to
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_review_id_from_location() {
        let id = ReviewId::from_location("https://api.partner.example/v2/service-reviews/ABC123").unwrap();
        assert_eq!(id.as_str(), "ABC123");

        let id = ReviewId::from_location("/reviews/XYZ/?expand=all").unwrap();
        assert_eq!(id.as_str(), "XYZ");

        assert!(ReviewId::from_location("   ").is_none());
        assert!(ReviewId::from_location("/").is_none());
    }

    #[test]
    fn test_snapshot_from_body() {
        let body = json!({
            "statusCode": 0,
            "status": "In Process",
            "statusReasons": [{"code": "01", "value": "Awaiting review"}],
            "validationMessages": ["subscriber.memberId is invalid", {"errorMessage": "bad date"}]
        });
        let snapshot = StatusSnapshot::from_body(ReviewId::new("R1"), 200, body);

        assert_eq!(snapshot.status, InternalStatus::InProcess);
        assert_eq!(snapshot.raw_code, "0");
        assert_eq!(snapshot.status_reasons.len(), 1);
        assert_eq!(snapshot.validation_messages, vec!["subscriber.memberId is invalid", "bad date"]);
    }

    #[test]
    fn test_snapshot_missing_fields() {
        let snapshot = StatusSnapshot::from_body(ReviewId::new("R1"), 200, json!({}));
        assert_eq!(snapshot.raw_code, "unknown");
        assert_eq!(snapshot.raw_text, "Unknown");
        assert_eq!(snapshot.status, InternalStatus::Unrecognized("unknown".to_string()));
    }

    #[test]
    fn test_terminal_state_rejects_updates() {
        let id = ReviewId::new("R1");
        let mut state = ReviewRequestState::new(id.clone());

        let done = StatusSnapshot::from_body(id.clone(), 200, json!({"statusCode": "A4", "status": "Pended"}));
        state.record(&done).unwrap();
        assert_eq!(state.attempts, 1);
        assert!(state.is_terminal());

        assert!(state.record(&done).is_err());
        assert!(state.mark_poll_timeout().is_err());
        assert_eq!(state.attempts, 1);
    }

    #[test]
    fn test_poll_timeout() {
        let mut state = ReviewRequestState::new(ReviewId::new("R1"));
        state.mark_poll_timeout().unwrap();
        assert_eq!(state.internal_status, InternalStatus::PollTimeout);
    }
}
