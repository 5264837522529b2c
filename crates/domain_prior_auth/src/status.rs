//! Status normalization
//!
//! Maps partner status codes and text onto the internal status vocabulary.
//! [`STATUS_RULES`] is the single source of truth and is checked in order;
//! within a rule the code is compared before the text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Internal review status
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalStatus {
    InProcess,
    Complete,
    PendedComplete,
    Error,
    ErrorTimeoutFromPlan,
    /// We stopped polling before the partner reached a terminal status
    PollTimeout,
    /// A partner code outside the known vocabulary, passed through as-is
    Unrecognized(String),
}

impl InternalStatus {
    /// Internal status code
    pub fn code(&self) -> &str {
        match self {
            InternalStatus::InProcess => "0",
            InternalStatus::Complete => "4",
            InternalStatus::PendedComplete => "A4",
            InternalStatus::Error => "400",
            InternalStatus::ErrorTimeoutFromPlan => "504",
            InternalStatus::PollTimeout => "TIMEOUT",
            InternalStatus::Unrecognized(code) => code,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            InternalStatus::InProcess => "In Process".to_string(),
            InternalStatus::Complete => "Complete".to_string(),
            InternalStatus::PendedComplete => "Pended (Complete)".to_string(),
            InternalStatus::Error => "Error".to_string(),
            InternalStatus::ErrorTimeoutFromPlan => "Timeout from health plan".to_string(),
            InternalStatus::PollTimeout => "Polling timeout".to_string(),
            InternalStatus::Unrecognized(code) => format!("Unknown status: {}", code),
        }
    }

    /// Returns true if polling should stop at this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InternalStatus::InProcess)
    }

    /// Returns true for statuses that end the review successfully
    pub fn is_success(&self) -> bool {
        matches!(self, InternalStatus::Complete | InternalStatus::PendedComplete)
    }
}

impl fmt::Display for InternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// Parses an internal status code; unknown codes become `Unrecognized`
impl FromStr for InternalStatus {
    type Err = std::convert::Infallible;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Ok(match code.trim() {
            "0" => InternalStatus::InProcess,
            "4" => InternalStatus::Complete,
            "A4" => InternalStatus::PendedComplete,
            "400" => InternalStatus::Error,
            "504" => InternalStatus::ErrorTimeoutFromPlan,
            "TIMEOUT" => InternalStatus::PollTimeout,
            other => InternalStatus::Unrecognized(other.to_string()),
        })
    }
}

/// One normalization rule: partner code, text fragment, resulting status
struct StatusRule {
    code: &'static str,
    text: &'static str,
    status: InternalStatus,
}

/// Normalization rules in priority order
///
/// A partner "pended" review is treated as a terminal success.
static STATUS_RULES: [StatusRule; 4] = [
    StatusRule { code: "A4", text: "Pended", status: InternalStatus::Complete },
    StatusRule { code: "0", text: "In Process", status: InternalStatus::InProcess },
    StatusRule { code: "400", text: "Error", status: InternalStatus::Error },
    StatusRule { code: "504", text: "Timeout", status: InternalStatus::ErrorTimeoutFromPlan },
];

/// Normalizes a partner status code and text
pub fn normalize(raw_code: &str, raw_text: &str) -> InternalStatus {
    let code = raw_code.trim();
    for rule in &STATUS_RULES {
        if code == rule.code || raw_text.contains(rule.text) {
            return rule.status.clone();
        }
    }

    warn!(raw_code = code, raw_text, "Unrecognized partner status");
    InternalStatus::Unrecognized(code.to_string())
}
