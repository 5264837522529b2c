//! Inbound mapping: partner service review to canonical claim
//!
//! Each field is converted independently and best-effort. Malformed dates
//! and quantities are logged and omitted; they never abort the conversion.
//! An absent procedure quantity stays absent on the item rather than being
//! filled with a default: the outbound mapper applies `default_quantity`
//! when it emits the procedure, so the claim records only what was sent.
//! Resource references are synthesized as `<ResourceType>/<id>` and are not
//! expected to survive a round trip.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use core_kernel::{parse_wire_date, ClaimId, DatePeriod, ResourceId};

use crate::claim::{CanonicalClaim, ClaimItem, ClaimReference};
use crate::defaults::DefaultsConfig;
use crate::error::MappingError;
use crate::service_review::ReceivedServiceReview;

/// Converts a partner payload, bare or wrapped, into a canonical claim
pub fn to_canonical(payload: &Value, config: &DefaultsConfig) -> Result<CanonicalClaim, MappingError> {
    let review = ReceivedServiceReview::from_json(payload)?;
    Ok(review_to_canonical(&review, config))
}

/// Converts an already-parsed service review into a canonical claim
pub fn review_to_canonical(review: &ReceivedServiceReview, config: &DefaultsConfig) -> CanonicalClaim {
    let mut claim = CanonicalClaim::new(Utc::now());
    claim.id = Some(
        review
            .id
            .clone()
            .unwrap_or_else(|| ClaimId::new_v7().to_string()),
    );

    let member_id = review.member_id.clone();
    let first_name = review
        .patient_first_name
        .as_ref()
        .or(review.subscriber_first_name.as_ref());
    let last_name = review
        .patient_last_name
        .as_ref()
        .or(review.subscriber_last_name.as_ref());
    let display = match (first_name, last_name) {
        (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    };

    let patient_id = member_id
        .clone()
        .or_else(|| {
            display
                .as_ref()
                .map(|d| d.split_whitespace().collect::<String>())
        })
        .unwrap_or_else(|| ResourceId::new().to_string());
    let mut patient = ClaimReference::to("Patient", &patient_id);
    patient.display = display;
    claim.patient = Some(patient);

    claim.patient_birth_date = review.patient_birth_date.as_deref().and_then(|raw| {
        parse_wire_date(raw)
            .map_err(|e| warn!(error = %e, "Ignoring unparseable patient birth date"))
            .ok()
    });

    let coverage_id = member_id.unwrap_or_else(|| ResourceId::new().to_string());
    claim.add_insurance(true, ClaimReference::to("Coverage", coverage_id));

    let payer_id = review
        .payer_id
        .clone()
        .unwrap_or_else(|| ResourceId::new().to_string());
    let mut insurer = ClaimReference::to("Organization", payer_id);
    insurer.display = review.payer_name.clone();
    claim.insurer = Some(insurer);

    for diagnosis in &review.diagnoses {
        match &diagnosis.code {
            Some(code) => {
                claim.add_diagnosis(Some(code.clone()), Some(config.diagnosis_code_system.clone()));
            }
            None => debug!("Skipping diagnosis without a code"),
        }
    }

    for procedure in &review.procedures {
        let Some(code) = procedure.code.clone() else {
            debug!("Skipping procedure without a code");
            continue;
        };

        let date = procedure.from_date.as_deref().and_then(|raw| {
            parse_wire_date(raw)
                .map_err(|e| warn!(error = %e, "Ignoring unparseable procedure date"))
                .ok()
        });
        let period = DatePeriod::from_wire(procedure.from_date.as_deref(), procedure.to_date.as_deref());
        if period.is_none() && (procedure.from_date.is_some() || procedure.to_date.is_some()) {
            warn!(
                from_date = procedure.from_date.as_deref().unwrap_or(""),
                to_date = procedure.to_date.as_deref().unwrap_or(""),
                "Ignoring unparseable service period"
            );
        }
        let quantity = procedure.quantity.as_deref().and_then(|raw| {
            raw.parse::<u32>()
                .map_err(|_| warn!(quantity = raw, "Ignoring unparseable quantity"))
                .ok()
        });

        claim.add_procedure(Some(code.clone()), Some(config.procedure_code_system.clone()), date);
        claim.add_item(ClaimItem {
            product_code: Some(code),
            product_system: Some(config.procedure_code_system.clone()),
            serviced_period: period,
            quantity,
            ..Default::default()
        });
    }

    debug!(
        diagnoses = claim.diagnoses.len(),
        procedures = claim.procedures.len(),
        "Mapped service review to claim"
    );
    claim
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use crate::claim::{ClaimStatus, ClaimUse};

    fn payload() -> Value {
        json!({
            "serviceReview": {
                "payer": {"id": "60054", "name": "Aetna"},
                "subscriber": {"memberId": "W123456789", "firstName": "Jane", "lastName": "Smith"},
                "patient": {"firstName": "Jane", "lastName": "Smith", "birthDate": "1980-02-29"},
                "diagnoses": [
                    {"qualifierCode": "ABK", "code": "M54.5", "sequence": 5},
                    {"qualifierCode": "ABF"},
                    {"qualifierCode": "ABF", "code": "R51"}
                ],
                "procedures": [
                    {"code": "72148", "fromDate": "2024-06-01", "toDate": "2024-06-30", "quantity": "2"},
                    {"code": "97110", "fromDate": "06/01/2024", "toDate": "2024-06-30", "quantity": "two"}
                ]
            }
        })
    }

    #[test]
    fn test_header_and_references() {
        let claim = to_canonical(&payload(), &DefaultsConfig::default()).unwrap();

        assert_eq!(claim.status, ClaimStatus::Active);
        assert_eq!(claim.claim_use, ClaimUse::Preauthorization);
        assert!(claim.id.as_deref().unwrap().starts_with("CLM-"));

        let patient = claim.patient.unwrap();
        assert_eq!(patient.reference.as_deref(), Some("Patient/W123456789"));
        assert_eq!(patient.display.as_deref(), Some("Jane Smith"));
        assert_eq!(claim.patient_birth_date, NaiveDate::from_ymd_opt(1980, 2, 29));

        let insurer = claim.insurer.unwrap();
        assert_eq!(insurer.reference.as_deref(), Some("Organization/60054"));
        assert_eq!(insurer.display.as_deref(), Some("Aetna"));

        assert_eq!(claim.insurance.len(), 1);
        assert!(claim.insurance[0].focal);
        assert_eq!(claim.insurance[0].coverage.reference.as_deref(), Some("Coverage/W123456789"));
    }

    #[test]
    fn test_diagnoses_are_resequenced() {
        let claim = to_canonical(&payload(), &DefaultsConfig::default()).unwrap();
        let got: Vec<(u32, &str)> = claim
            .diagnoses
            .iter()
            .map(|d| (d.sequence, d.code.as_deref().unwrap()))
            .collect();
        assert_eq!(got, vec![(1, "M54.5"), (2, "R51")]);
        assert_eq!(claim.diagnoses[0].system.as_deref(), Some("http://hl7.org/fhir/sid/icd-10"));
    }

    #[test]
    fn test_procedures_mirror_items() {
        let claim = to_canonical(&payload(), &DefaultsConfig::default()).unwrap();
        assert_eq!(claim.procedures.len(), 2);
        assert_eq!(claim.items.len(), 2);

        for (procedure, item) in claim.procedures.iter().zip(&claim.items) {
            assert_eq!(procedure.sequence, item.sequence);
            assert_eq!(procedure.code, item.product_code);
        }

        let first = &claim.items[0];
        assert_eq!(first.quantity, Some(2));
        assert_eq!(
            first.serviced_period.unwrap().end,
            NaiveDate::from_ymd_opt(2024, 6, 30)
        );

        // malformed start date and quantity are dropped, the rest survives
        let second = &claim.items[1];
        assert_eq!(second.quantity, None);
        let period = second.serviced_period.unwrap();
        assert_eq!(period.start, None);
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(claim.procedures[1].date, None);
    }

    #[test]
    fn test_absent_quantity_stays_absent() {
        let config = DefaultsConfig::default();
        let claim = to_canonical(&json!({"procedures": [{"code": "72148"}]}), &config).unwrap();
        assert_eq!(claim.items[0].quantity, None);

        let review = crate::outbound::to_partner_format(&claim, &config).service_review;
        assert_eq!(review.procedures[0].quantity, "1");
    }

    #[test]
    fn test_payload_id_is_kept() {
        let claim = to_canonical(&json!({"id": "CLM-42"}), &DefaultsConfig::default()).unwrap();
        assert_eq!(claim.id.as_deref(), Some("CLM-42"));
        assert!(claim.diagnoses.is_empty());
        assert!(claim.insurance[0].coverage.reference.as_deref().unwrap().starts_with("Coverage/"));
    }

    #[test]
    fn test_non_object_is_an_error() {
        assert!(to_canonical(&json!(42), &DefaultsConfig::default()).is_err());
    }
}
