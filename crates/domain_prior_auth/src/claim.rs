//! Canonical claim aggregate
//!
//! The standardized clinical prior-authorization request. Sequence numbers on
//! every list are 1-based and contiguous; they are assigned here, when entries
//! are added, and never trusted from input.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use core_kernel::{parse_wire_date, DatePeriod};

use crate::error::MappingError;
use crate::service_review::{object, objects, text};

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    #[default]
    Draft,
    Active,
    Cancelled,
}

/// Claim use. Only prior authorization is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimUse {
    #[default]
    Preauthorization,
}

/// A loosely-typed pointer to another resource
///
/// Any combination of fields may be present: a slash-delimited reference
/// (`Practitioner/123`), a bare identifier value, and a display name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl ClaimReference {
    /// Creates a `<ResourceType>/<id>` reference
    pub fn to(resource_type: &str, id: impl AsRef<str>) -> Self {
        Self {
            reference: Some(format!("{}/{}", resource_type, id.as_ref())),
            ..Default::default()
        }
    }

    /// Sets the display name
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Sets the identifier value
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// The reference string, if present and not blank
    pub fn reference_str(&self) -> Option<&str> {
        non_blank(self.reference.as_deref())
    }

    /// The identifier value, if present and not blank
    pub fn identifier_str(&self) -> Option<&str> {
        non_blank(self.identifier.as_deref())
    }

    /// The display name, trimmed, if present and not blank
    pub fn display_str(&self) -> Option<&str> {
        non_blank(self.display.as_deref())
    }
}

/// A diagnosis entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimDiagnosis {
    pub sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// A procedure entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimProcedure {
    pub sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// A billable line item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimItem {
    pub sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serviced_period: Option<DatePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// An insurance/coverage entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimInsurance {
    pub sequence: u32,
    pub focal: bool,
    pub coverage: ClaimReference,
}

/// A prior authorization claim in the standardized representation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanonicalClaim {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: ClaimStatus,
    #[serde(rename = "use")]
    pub claim_use: ClaimUse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<ClaimReference>,
    /// Patient birth date, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ClaimReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurer: Option<ClaimReference>,
    pub diagnoses: Vec<ClaimDiagnosis>,
    pub procedures: Vec<ClaimProcedure>,
    pub items: Vec<ClaimItem>,
    pub insurance: Vec<ClaimInsurance>,
}

impl CanonicalClaim {
    /// Creates an empty active prior authorization claim
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            status: ClaimStatus::Active,
            created_at: Some(created_at),
            ..Default::default()
        }
    }

    /// Appends a diagnosis and assigns its sequence
    pub fn add_diagnosis(&mut self, code: Option<String>, system: Option<String>) -> u32 {
        let sequence = next_sequence(self.diagnoses.len());
        self.diagnoses.push(ClaimDiagnosis { sequence, code, system });
        sequence
    }

    /// Appends a procedure and assigns its sequence
    pub fn add_procedure(
        &mut self,
        code: Option<String>,
        system: Option<String>,
        date: Option<NaiveDate>,
    ) -> u32 {
        let sequence = next_sequence(self.procedures.len());
        self.procedures.push(ClaimProcedure { sequence, code, system, date });
        sequence
    }

    /// Appends a line item and assigns its sequence
    pub fn add_item(&mut self, mut item: ClaimItem) -> u32 {
        item.sequence = next_sequence(self.items.len());
        let sequence = item.sequence;
        self.items.push(item);
        sequence
    }

    /// Appends an insurance entry and assigns its sequence
    pub fn add_insurance(&mut self, focal: bool, coverage: ClaimReference) -> u32 {
        let sequence = next_sequence(self.insurance.len());
        self.insurance.push(ClaimInsurance { sequence, focal, coverage });
        sequence
    }

    /// Decodes an untyped claim payload field by field
    ///
    /// Only a payload that is not a JSON object is an error. A malformed
    /// field (a bad date, a negative quantity, a reference that is not an
    /// object) is logged and treated as absent; the rest of the claim is
    /// kept. Sequence numbers from the payload are ignored.
    pub fn from_json(payload: &Value) -> Result<Self, MappingError> {
        let map = payload.as_object().ok_or(MappingError::NotAnObject {
            found: MappingError::kind_of(payload),
        })?;

        let mut claim = CanonicalClaim {
            id: text(map, "id"),
            status: parsed(map, "status").unwrap_or_default(),
            claim_use: ClaimUse::Preauthorization,
            created_at: parsed(map, "createdAt"),
            patient: reference(map, "patient"),
            patient_birth_date: date(map, "patientBirthDate"),
            provider: reference(map, "provider"),
            insurer: reference(map, "insurer"),
            ..Default::default()
        };

        for d in objects(map, "diagnoses") {
            claim.add_diagnosis(text(d, "code"), text(d, "system"));
        }
        for p in objects(map, "procedures") {
            claim.add_procedure(text(p, "code"), text(p, "system"), date(p, "date"));
        }
        for item in objects(map, "items") {
            let serviced_period = object(item, "servicedPeriod")
                .map(|period| DatePeriod {
                    start: date(period, "start"),
                    end: date(period, "end"),
                })
                .filter(|period| !period.is_empty());
            claim.add_item(ClaimItem {
                product_code: text(item, "productCode"),
                product_system: text(item, "productSystem"),
                serviced_period,
                quantity: quantity(item, "quantity"),
                ..Default::default()
            });
        }
        for entry in objects(map, "insurance") {
            let focal = parsed(entry, "focal").unwrap_or(false);
            let coverage = reference(entry, "coverage").unwrap_or_default();
            claim.add_insurance(focal, coverage);
        }

        Ok(claim)
    }

    /// The first line item that carries a non-empty service period
    pub fn first_serviced_period(&self) -> Option<&DatePeriod> {
        self.items
            .iter()
            .filter_map(|item| item.serviced_period.as_ref())
            .find(|period| !period.is_empty())
    }
}

fn next_sequence(len: usize) -> u32 {
    u32::try_from(len).map_or(u32::MAX, |n| n.saturating_add(1))
}

/// Deserializes one field, logging and dropping it when malformed
fn parsed<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| warn!(field = key, error = %e, "Ignoring malformed claim field"))
            .ok(),
    }
}

fn reference(map: &Map<String, Value>, key: &str) -> Option<ClaimReference> {
    object(map, key).map(|r| ClaimReference {
        reference: text(r, "reference"),
        identifier: text(r, "identifier"),
        display: text(r, "display"),
    })
}

fn date(map: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    let raw = text(map, key)?;
    parse_wire_date(&raw)
        .map_err(|e| warn!(field = key, error = %e, "Ignoring unparseable claim date"))
        .ok()
}

fn quantity(map: &Map<String, Value>, key: &str) -> Option<u32> {
    let raw = text(map, key)?;
    raw.parse::<u32>()
        .map_err(|_| warn!(field = key, quantity = %raw, "Ignoring unparseable claim quantity"))
        .ok()
}

/// Returns the trimmed value if it has any non-whitespace content
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_assigns_contiguous_sequences() {
        let mut claim = CanonicalClaim::new(Utc::now());
        assert_eq!(claim.add_diagnosis(Some("R51".into()), None), 1);
        assert_eq!(claim.add_diagnosis(Some("M54.5".into()), None), 2);
        assert_eq!(claim.add_procedure(Some("72148".into()), None, None), 1);
    }

    #[test]
    fn test_decode_uses_fixed_use_and_defaults() {
        let claim: CanonicalClaim = serde_json::from_value(json!({"status": "active"})).unwrap();
        assert_eq!(claim.status, ClaimStatus::Active);
        assert_eq!(claim.claim_use, ClaimUse::Preauthorization);
        assert!(claim.diagnoses.is_empty());
    }

    #[test]
    fn test_from_json_keeps_good_fields_around_bad_ones() {
        let claim = CanonicalClaim::from_json(&json!({
            "status": "pending-review",
            "createdAt": "yesterday",
            "insurer": {"reference": "Organization/60054", "display": "Aetna"},
            "provider": "Practitioner/1234567890",
            "diagnoses": [{"sequence": 9, "code": "M54.5"}, 42],
            "procedures": [{"code": "72148", "date": "06/01/2024"}],
            "items": [
                {"productCode": "72148", "servicedPeriod": {"start": "06/01/2024", "end": "2024-06-30"}, "quantity": 2},
                {"quantity": -1, "servicedPeriod": {"start": "bad"}},
                {"quantity": 1.5}
            ]
        }))
        .unwrap();

        assert_eq!(claim.status, ClaimStatus::Draft);
        assert_eq!(claim.created_at, None);
        assert_eq!(claim.provider, None);
        assert_eq!(claim.insurer.as_ref().and_then(ClaimReference::reference_str), Some("Organization/60054"));
        assert_eq!(claim.diagnoses.len(), 1);
        assert_eq!(claim.diagnoses[0].sequence, 1);
        assert_eq!(claim.diagnoses[0].code.as_deref(), Some("M54.5"));
        assert_eq!(claim.procedures[0].code.as_deref(), Some("72148"));
        assert_eq!(claim.procedures[0].date, None);

        assert_eq!(claim.items.len(), 3);
        let period = claim.items[0].serviced_period.unwrap();
        assert_eq!(period.start, None);
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(claim.items[0].quantity, Some(2));
        assert_eq!(claim.items[1].quantity, None);
        assert_eq!(claim.items[1].serviced_period, None);
        assert_eq!(claim.items[2].quantity, None);
    }

    #[test]
    fn test_from_json_matches_serialized_claim() {
        let mut claim = CanonicalClaim::new(Utc::now());
        claim.insurer = Some(ClaimReference::to("Organization", "60054").with_display("Aetna"));
        claim.patient_birth_date = NaiveDate::from_ymd_opt(1980, 2, 29);
        claim.add_diagnosis(Some("M54.5".into()), Some("http://hl7.org/fhir/sid/icd-10".into()));
        claim.add_procedure(Some("72148".into()), None, NaiveDate::from_ymd_opt(2024, 6, 1));
        claim.add_item(ClaimItem {
            product_code: Some("72148".into()),
            serviced_period: Some(DatePeriod {
                start: NaiveDate::from_ymd_opt(2024, 6, 1),
                end: NaiveDate::from_ymd_opt(2024, 6, 30),
            }),
            quantity: Some(3),
            ..Default::default()
        });
        claim.add_insurance(true, ClaimReference::to("Coverage", "W123456789"));

        let decoded = CanonicalClaim::from_json(&serde_json::to_value(&claim).unwrap()).unwrap();
        assert_eq!(decoded, claim);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = CanonicalClaim::from_json(&json!("claim")).unwrap_err();
        assert!(matches!(err, MappingError::NotAnObject { found: "string" }));
    }

    #[test]
    fn test_blank_reference_fields_are_absent() {
        let reference = ClaimReference {
            reference: Some("   ".into()),
            identifier: None,
            display: Some(" Jane Smith ".into()),
        };
        assert_eq!(reference.reference_str(), None);
        assert_eq!(reference.display_str(), Some("Jane Smith"));
    }
}
