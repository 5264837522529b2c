//! Offline commands behind the `prior-auth` binary
//!
//! Each command is a pure function over JSON so it can be tested without
//! touching the filesystem.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use domain_prior_auth::{
    normalize, to_canonical, to_partner_format_json, DefaultsConfig, InternalStatus, MappingError,
};

/// Converts a canonical claim payload into the wrapped partner request
pub fn convert(payload: &Value, config: &DefaultsConfig) -> Result<Value, MappingError> {
    let envelope = to_partner_format_json(payload, config);
    let value = serde_json::to_value(&envelope).map_err(MappingError::Encode)?;
    debug!(payload = %value, "Converted claim");
    Ok(value)
}

/// Converts a partner service-review payload back into a canonical claim
pub fn revert(payload: &Value, config: &DefaultsConfig) -> Result<Value, MappingError> {
    let claim = to_canonical(payload, config)?;
    serde_json::to_value(&claim).map_err(MappingError::Encode)
}

/// Result of normalising a partner status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub raw_code: String,
    pub raw_text: String,
    pub status: InternalStatus,
    pub code: String,
    pub description: String,
    pub terminal: bool,
    pub success: bool,
}

/// Normalises a partner status code and text
pub fn describe_status(raw_code: &str, raw_text: &str) -> StatusReport {
    let status = normalize(raw_code, raw_text);
    StatusReport {
        raw_code: raw_code.to_string(),
        raw_text: raw_text.to_string(),
        code: status.code().to_string(),
        description: status.description(),
        terminal: status.is_terminal(),
        success: status.is_success(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claim() -> Value {
        json!({
            "status": "active",
            "use": "preauthorization",
            "createdAt": "2024-05-01T09:30:00Z",
            "patient": {"reference": "Patient/p1", "display": "Jane Doe"},
            "provider": {"reference": "Practitioner/1234567890", "display": "Alan Grant"},
            "insurer": {"reference": "Organization/60054", "display": "Aetna"},
            "diagnoses": [{"sequence": 1, "code": "M54.5"}],
            "procedures": [{"sequence": 1, "code": "72148"}]
        })
    }

    #[test]
    fn test_convert_wraps_review() {
        let value = convert(&claim(), &DefaultsConfig::default()).unwrap();
        let review = &value["serviceReview"];
        assert_eq!(review["payer"]["id"], json!("60054"));
        assert_eq!(review["requestingProvider"]["npi"], json!("1234567890"));
        assert_eq!(review["diagnoses"][0]["code"], json!("M54.5"));
    }

    #[test]
    fn test_convert_non_object_yields_defaults() {
        let value = convert(&json!([1, 2]), &DefaultsConfig::default()).unwrap();
        assert_eq!(value["serviceReview"]["payer"]["id"], json!("unknown"));
        assert_eq!(value["serviceReview"]["diagnoses"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_revert_rejects_non_object() {
        let err = revert(&json!("review"), &DefaultsConfig::default()).unwrap_err();
        assert!(matches!(err, MappingError::NotAnObject { .. }));
    }

    #[test]
    fn test_revert_after_convert_keeps_codes() {
        let config = DefaultsConfig::default();
        let partner = convert(&claim(), &config).unwrap();
        let back = revert(&partner, &config).unwrap();
        assert_eq!(back["diagnoses"][0]["code"], json!("M54.5"));
        assert_eq!(back["procedures"][0]["code"], json!("72148"));
    }

    #[test]
    fn test_describe_status() {
        let report = describe_status("A4", "Pended");
        assert_eq!(report.status, InternalStatus::Complete);
        assert_eq!(report.code, "4");
        assert!(report.terminal);

        let report = describe_status("0", "In Process");
        assert!(!report.terminal);
        assert!(!report.success);

        let report = describe_status("999", "");
        assert_eq!(report.description, "Unknown status: 999");
    }
}
