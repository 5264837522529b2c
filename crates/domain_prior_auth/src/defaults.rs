//! Partner code defaults
//!
//! Injected into the outbound mapper. Every code the partner requires but the
//! canonical claim cannot supply comes from here.

use serde::{Deserialize, Serialize};

/// Default codes for the partner service review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Request type (`HS` = health services review)
    pub request_type_code: String,
    pub service_type_code: String,
    pub place_of_service_code: String,
    pub service_level_code: String,
    /// Quantity type of the top-level request (`VS` = visits)
    pub quantity_type_code: String,
    /// Procedure code qualifier (`HC` = HCPCS/CPT)
    pub procedure_qualifier_code: String,
    /// Quantity type of each procedure (`UN` = units)
    pub procedure_quantity_type_code: String,
    /// Diagnosis code qualifier (`ABK` = ICD-10 principal)
    pub diagnosis_qualifier_code: String,
    /// Patient relationship to subscriber (`18` = self)
    pub subscriber_relationship_code: String,
    /// Requesting provider role (`1P` = provider)
    pub provider_role_code: String,
    /// Rendering provider role (`71` = attending)
    pub rendering_provider_role_code: String,
    pub diagnosis_code_system: String,
    pub procedure_code_system: String,
    /// Quantity used when a claim item carries none
    pub default_quantity: String,
    /// Code used for a diagnosis without one, and for the synthetic entry
    pub diagnosis_default_code: Option<String>,
    /// Code used for a procedure without one, and for the synthetic entry
    pub procedure_default_code: Option<String>,
    /// Length of the fallback service window, in days after its start
    pub fallback_window_days: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            request_type_code: "HS".to_string(),
            service_type_code: "73".to_string(),
            place_of_service_code: "22".to_string(),
            service_level_code: "E".to_string(),
            quantity_type_code: "VS".to_string(),
            procedure_qualifier_code: "HC".to_string(),
            procedure_quantity_type_code: "UN".to_string(),
            diagnosis_qualifier_code: "ABK".to_string(),
            subscriber_relationship_code: "18".to_string(),
            provider_role_code: "1P".to_string(),
            rendering_provider_role_code: "71".to_string(),
            diagnosis_code_system: "http://hl7.org/fhir/sid/icd-10".to_string(),
            procedure_code_system: "http://www.ama-assn.org/go/cpt".to_string(),
            default_quantity: "1".to_string(),
            diagnosis_default_code: None,
            procedure_default_code: None,
            fallback_window_days: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: DefaultsConfig = serde_json::from_value(json!({
            "service_type_code": "1",
            "diagnosis_default_code": "Z00.00"
        }))
        .unwrap();

        assert_eq!(config.service_type_code, "1");
        assert_eq!(config.diagnosis_default_code.as_deref(), Some("Z00.00"));
        assert_eq!(config.request_type_code, "HS");
        assert_eq!(config.rendering_provider_role_code, "71");
    }
}
