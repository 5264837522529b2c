//! Partner service-review wire model
//!
//! Two shapes live here. [`ServiceReview`] is what we emit: every field is a
//! required string, so the type itself forbids `null` or absent fields.
//! [`ReceivedServiceReview`] is what we accept: a lenient, fully optional view
//! produced by a single total parsing pass over untyped JSON, so the inbound
//! mapper never has to navigate raw maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::MappingError;

/// Universal fallback for any field that cannot be derived
pub const UNKNOWN: &str = "unknown";

/// Key of the optional envelope around a service review
pub const ENVELOPE_KEY: &str = "serviceReview";

/// `{ "serviceReview": { ... } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReviewEnvelope {
    pub service_review: ServiceReview,
}

impl From<ServiceReview> for ServiceReviewEnvelope {
    fn from(service_review: ServiceReview) -> Self {
        Self { service_review }
    }
}

/// Service review as submitted to the partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReview {
    pub payer: Payer,
    pub requesting_provider: ProviderRecord,
    pub subscriber: Subscriber,
    pub patient: PatientRecord,
    pub diagnoses: Vec<DiagnosisRecord>,
    pub procedures: Vec<ProcedureRecord>,
    pub rendering_providers: Vec<ProviderRecord>,
    pub request_type_code: String,
    pub service_type_code: String,
    pub place_of_service_code: String,
    pub service_level_code: String,
    pub from_date: String,
    pub to_date: String,
    pub quantity: String,
    pub quantity_type_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    pub id: String,
    pub name: String,
}

/// Requesting or rendering provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    pub npi: String,
    pub first_name: String,
    pub last_name: String,
    pub role_code: String,
    pub tax_id: String,
    pub address_line1: String,
    pub city: String,
    pub state_code: String,
    pub zip_code: String,
    pub phone: String,
    pub contact_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub first_name: String,
    pub last_name: String,
    pub subscriber_relationship_code: String,
    pub birth_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRecord {
    pub qualifier_code: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureRecord {
    pub from_date: String,
    pub to_date: String,
    pub code: String,
    pub qualifier_code: String,
    pub quantity: String,
    pub quantity_type_code: String,
}

/// A received diagnosis entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceivedDiagnosis {
    pub code: Option<String>,
    pub qualifier_code: Option<String>,
}

/// A received procedure entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceivedProcedure {
    pub code: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub quantity: Option<String>,
}

/// Lenient view of a partner service review
///
/// Every scalar is `None` when absent, `null`, blank, or of a non-scalar
/// JSON kind. Numbers and booleans are accepted and kept as their text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceivedServiceReview {
    pub id: Option<String>,
    pub payer_id: Option<String>,
    pub payer_name: Option<String>,
    pub member_id: Option<String>,
    pub subscriber_first_name: Option<String>,
    pub subscriber_last_name: Option<String>,
    pub patient_first_name: Option<String>,
    pub patient_last_name: Option<String>,
    pub patient_birth_date: Option<String>,
    pub diagnoses: Vec<ReceivedDiagnosis>,
    pub procedures: Vec<ReceivedProcedure>,
}

impl ReceivedServiceReview {
    /// Parses a service review, bare or wrapped in a `serviceReview` envelope
    pub fn from_json(payload: &Value) -> Result<Self, MappingError> {
        let outer = payload.as_object().ok_or(MappingError::NotAnObject {
            found: MappingError::kind_of(payload),
        })?;

        let review = match outer.get(ENVELOPE_KEY) {
            Some(inner) => inner.as_object().ok_or(MappingError::InvalidEnvelope {
                found: MappingError::kind_of(inner),
            })?,
            None => outer,
        };

        let payer = object(review, "payer");
        let subscriber = object(review, "subscriber");
        let patient = object(review, "patient");

        Ok(Self {
            id: text(review, "id"),
            payer_id: payer.and_then(|p| text(p, "id")),
            payer_name: payer.and_then(|p| text(p, "name")),
            member_id: subscriber.and_then(|s| text(s, "memberId")),
            subscriber_first_name: subscriber.and_then(|s| text(s, "firstName")),
            subscriber_last_name: subscriber.and_then(|s| text(s, "lastName")),
            patient_first_name: patient.and_then(|p| text(p, "firstName")),
            patient_last_name: patient.and_then(|p| text(p, "lastName")),
            patient_birth_date: patient.and_then(|p| text(p, "birthDate")),
            diagnoses: objects(review, "diagnoses")
                .map(|d| ReceivedDiagnosis {
                    code: text(d, "code"),
                    qualifier_code: text(d, "qualifierCode"),
                })
                .collect(),
            procedures: objects(review, "procedures")
                .map(|p| ReceivedProcedure {
                    code: text(p, "code"),
                    from_date: text(p, "fromDate"),
                    to_date: text(p, "toDate"),
                    quantity: text(p, "quantity"),
                })
                .collect(),
        })
    }
}

impl From<&ServiceReview> for ReceivedServiceReview {
    fn from(review: &ServiceReview) -> Self {
        Self {
            id: None,
            payer_id: known(&review.payer.id),
            payer_name: known(&review.payer.name),
            member_id: known(&review.subscriber.member_id),
            subscriber_first_name: known(&review.subscriber.first_name),
            subscriber_last_name: known(&review.subscriber.last_name),
            patient_first_name: known(&review.patient.first_name),
            patient_last_name: known(&review.patient.last_name),
            patient_birth_date: known(&review.patient.birth_date),
            diagnoses: review
                .diagnoses
                .iter()
                .map(|d| ReceivedDiagnosis {
                    code: present(&d.code),
                    qualifier_code: present(&d.qualifier_code),
                })
                .collect(),
            procedures: review
                .procedures
                .iter()
                .map(|p| ReceivedProcedure {
                    code: present(&p.code),
                    from_date: known(&p.from_date),
                    to_date: known(&p.to_date),
                    quantity: known(&p.quantity),
                })
                .collect(),
        }
    }
}

/// Drops blanks only; codes are kept verbatim, placeholder included
fn present(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Drops blanks and the `"unknown"` placeholder
fn known(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == UNKNOWN {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn object<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    match map.get(key) {
        Some(Value::Object(inner)) => Some(inner),
        Some(Value::Null) | None => None,
        Some(other) => {
            warn!(field = key, found = MappingError::kind_of(other), "Ignoring non-object field");
            None
        }
    }
}

pub(crate) fn objects<'a>(
    map: &'a Map<String, Value>,
    key: &'a str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    let entries: &'a [Value] = match map.get(key) {
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            warn!(field = key, found = MappingError::kind_of(other), "Ignoring non-array field");
            &[]
        }
    };

    entries.iter().enumerate().filter_map(move |(index, entry)| match entry {
        Value::Object(inner) => Some(inner),
        other => {
            warn!(field = key, index, found = MappingError::kind_of(other), "Skipping non-object entry");
            None
        }
    })
}

pub(crate) fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
