//! Outbound mapping: canonical claim to partner service review
//!
//! Every partner field follows the same precedence: claim data when present
//! and well-formed, else the configured default, else `"unknown"`. The
//! mapping is total; it never fails on missing data.

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use core_kernel::{format_wire_date, DatePeriod};

use crate::claim::{non_blank, CanonicalClaim, ClaimReference};
use crate::defaults::DefaultsConfig;
use crate::error::MappingError;
use crate::ports::{PatientDetails, ProviderDetails, ResourceLookup};
use crate::reference::resolve_opt;
use crate::service_review::{
    DiagnosisRecord, Payer, PatientRecord, ProcedureRecord, ProviderRecord, ServiceReview,
    ServiceReviewEnvelope, Subscriber, UNKNOWN,
};

/// Maps a claim using only the data it carries
pub fn to_partner_format(claim: &CanonicalClaim, config: &DefaultsConfig) -> ServiceReviewEnvelope {
    let provider = ProviderDetails::from(resolve_opt(claim.provider.as_ref()));
    let patient = PatientDetails::from(resolve_opt(claim.patient.as_ref()));
    build(claim, config, provider, patient)
}

/// Maps an untyped claim payload
///
/// A payload that is not a claim object maps as an empty claim, which
/// yields an all-defaults service review.
pub fn to_partner_format_json(payload: &Value, config: &DefaultsConfig) -> ServiceReviewEnvelope {
    let claim = match decode_claim(payload) {
        Ok(claim) => claim,
        Err(e) => {
            warn!(error = %e, "Claim payload unusable, mapping all-default service review");
            CanonicalClaim::default()
        }
    };
    to_partner_format(&claim, config)
}

/// Decodes an untyped claim payload
///
/// Malformed fields are dropped one by one; only a non-object payload fails.
pub fn decode_claim(payload: &Value) -> Result<CanonicalClaim, MappingError> {
    CanonicalClaim::from_json(payload)
}

/// Maps a claim, enriching provider and patient from a live lookup
///
/// A lookup that finds nothing or fails falls back to the reference
/// resolver, field by field.
pub async fn to_partner_format_with_lookup(
    claim: &CanonicalClaim,
    config: &DefaultsConfig,
    lookup: &dyn ResourceLookup,
) -> ServiceReviewEnvelope {
    let resolved_provider = ProviderDetails::from(resolve_opt(claim.provider.as_ref()));
    let resolved_patient = PatientDetails::from(resolve_opt(claim.patient.as_ref()));

    let provider = match reference_of(claim.provider.as_ref()) {
        Some(reference) => match lookup.fetch_practitioner(reference).await {
            Ok(Some(found)) => merge_provider(found, resolved_provider),
            Ok(None) => resolved_provider,
            Err(e) => {
                warn!(reference, error = %e, transient = e.is_transient(), "Practitioner lookup failed, using reference");
                resolved_provider
            }
        },
        None => resolved_provider,
    };

    let patient = match reference_of(claim.patient.as_ref()) {
        Some(reference) => match lookup.fetch_patient(reference).await {
            Ok(Some(found)) => merge_patient(found, resolved_patient),
            Ok(None) => resolved_patient,
            Err(e) => {
                warn!(reference, error = %e, transient = e.is_transient(), "Patient lookup failed, using reference");
                resolved_patient
            }
        },
        None => resolved_patient,
    };

    build(claim, config, provider, patient)
}

fn reference_of(reference: Option<&ClaimReference>) -> Option<&str> {
    reference.and_then(ClaimReference::reference_str)
}

fn merge_provider(found: ProviderDetails, fallback: ProviderDetails) -> ProviderDetails {
    ProviderDetails {
        npi: found.npi.or(fallback.npi),
        first_name: found.first_name.or(fallback.first_name),
        last_name: found.last_name.or(fallback.last_name),
        contact_name: found.contact_name.or(fallback.contact_name),
        tax_id: found.tax_id.or(fallback.tax_id),
        address_line1: found.address_line1.or(fallback.address_line1),
        city: found.city.or(fallback.city),
        state_code: found.state_code.or(fallback.state_code),
        zip_code: found.zip_code.or(fallback.zip_code),
        phone: found.phone.or(fallback.phone),
    }
}

fn merge_patient(found: PatientDetails, fallback: PatientDetails) -> PatientDetails {
    PatientDetails {
        member_id: found.member_id.or(fallback.member_id),
        first_name: found.first_name.or(fallback.first_name),
        last_name: found.last_name.or(fallback.last_name),
        birth_date: found.birth_date.or(fallback.birth_date),
    }
}

/// Field or `"unknown"`
fn or_unknown(value: Option<&str>) -> String {
    non_blank(value).unwrap_or(UNKNOWN).to_string()
}

/// Claim value, else configured default, else `"unknown"`
fn code_or_default(value: Option<&str>, default: Option<&str>) -> String {
    non_blank(value)
        .or_else(|| non_blank(default))
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn build(
    claim: &CanonicalClaim,
    config: &DefaultsConfig,
    provider: ProviderDetails,
    patient: PatientDetails,
) -> ServiceReviewEnvelope {
    let reference_date = claim
        .created_at
        .map(|created| created.date_naive())
        .unwrap_or_else(|| Utc::now().date_naive());

    let (from_date, to_date) = service_dates(claim, config, reference_date);

    let requesting_provider = provider_record(&provider, &config.provider_role_code);
    let rendering_provider = ProviderRecord {
        role_code: config.rendering_provider_role_code.clone(),
        ..requesting_provider.clone()
    };

    let birth_date = claim
        .patient_birth_date
        .or(patient.birth_date)
        .unwrap_or(reference_date);

    let review = ServiceReview {
        payer: payer(claim.insurer.as_ref()),
        requesting_provider,
        subscriber: Subscriber {
            member_id: or_unknown(patient.member_id.as_deref()),
            first_name: or_unknown(patient.first_name.as_deref()),
            last_name: or_unknown(patient.last_name.as_deref()),
        },
        patient: PatientRecord {
            first_name: or_unknown(patient.first_name.as_deref()),
            last_name: or_unknown(patient.last_name.as_deref()),
            subscriber_relationship_code: config.subscriber_relationship_code.clone(),
            birth_date: format_wire_date(birth_date),
        },
        diagnoses: diagnoses(claim, config),
        procedures: procedures(claim, config, (from_date, to_date)),
        rendering_providers: vec![rendering_provider],
        request_type_code: config.request_type_code.clone(),
        service_type_code: config.service_type_code.clone(),
        place_of_service_code: config.place_of_service_code.clone(),
        service_level_code: config.service_level_code.clone(),
        from_date: format_wire_date(from_date),
        to_date: format_wire_date(to_date),
        quantity: or_unknown(Some(&config.default_quantity)),
        quantity_type_code: config.quantity_type_code.clone(),
    };

    debug!(
        diagnoses = review.diagnoses.len(),
        procedures = review.procedures.len(),
        "Mapped claim to service review"
    );
    review.into()
}

/// Payer id is the insurer's identifier, else its reference id, else its name
fn payer(insurer: Option<&ClaimReference>) -> Payer {
    let resolved = resolve_opt(insurer);
    let display = insurer.and_then(ClaimReference::display_str);
    let id = insurer
        .and_then(ClaimReference::identifier_str)
        .or_else(|| Some(resolved.id.as_str()).filter(|id| *id != UNKNOWN))
        .or(display);

    Payer {
        id: or_unknown(id),
        name: or_unknown(display),
    }
}

fn provider_record(provider: &ProviderDetails, role_code: &str) -> ProviderRecord {
    ProviderRecord {
        npi: or_unknown(provider.npi.as_deref()),
        first_name: or_unknown(provider.first_name.as_deref()),
        last_name: or_unknown(provider.last_name.as_deref()),
        role_code: role_code.to_string(),
        tax_id: or_unknown(provider.tax_id.as_deref()),
        address_line1: or_unknown(provider.address_line1.as_deref()),
        city: or_unknown(provider.city.as_deref()),
        state_code: or_unknown(provider.state_code.as_deref()),
        zip_code: or_unknown(provider.zip_code.as_deref()),
        phone: or_unknown(provider.phone.as_deref()),
        contact_name: or_unknown(provider.contact_name.as_deref()),
    }
}

/// Fallback service window anchored at the reference date
fn fallback_window(config: &DefaultsConfig, reference_date: NaiveDate) -> (NaiveDate, NaiveDate) {
    match DatePeriod::window(reference_date, config.fallback_window_days) {
        Ok(DatePeriod {
            start: Some(start),
            end: Some(end),
        }) => (start, end),
        Ok(_) => (reference_date, reference_date),
        Err(e) => {
            warn!(error = %e, "Fallback window out of range, using a single day");
            (reference_date, reference_date)
        }
    }
}

/// Resolves a possibly half-open period, each side borrowing from the other
fn bounds(period: &DatePeriod, fallback: (NaiveDate, NaiveDate)) -> (NaiveDate, NaiveDate) {
    let start = period.start.or(period.end).unwrap_or(fallback.0);
    let end = period.end.or(period.start).unwrap_or(fallback.1);
    (start, end)
}

fn service_dates(
    claim: &CanonicalClaim,
    config: &DefaultsConfig,
    reference_date: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let fallback = fallback_window(config, reference_date);
    match claim.first_serviced_period() {
        Some(period) => bounds(period, fallback),
        None => fallback,
    }
}

fn diagnoses(claim: &CanonicalClaim, config: &DefaultsConfig) -> Vec<DiagnosisRecord> {
    let default_code = config.diagnosis_default_code.as_deref();
    let record = |code: Option<&str>| DiagnosisRecord {
        qualifier_code: config.diagnosis_qualifier_code.clone(),
        code: code_or_default(code, default_code),
    };

    if claim.diagnoses.is_empty() {
        return vec![record(None)];
    }
    claim
        .diagnoses
        .iter()
        .map(|d| record(d.code.as_deref()))
        .collect()
}

fn procedures(
    claim: &CanonicalClaim,
    config: &DefaultsConfig,
    top_level: (NaiveDate, NaiveDate),
) -> Vec<ProcedureRecord> {
    let default_code = config.procedure_default_code.as_deref();
    let record = |index: usize, code: Option<&str>| {
        let item = claim.items.get(index);
        let (from, to) = item
            .and_then(|i| i.serviced_period.as_ref())
            .filter(|p| !p.is_empty())
            .map(|p| bounds(p, top_level))
            .unwrap_or(top_level);
        let quantity = item
            .and_then(|i| i.quantity)
            .map(|q| q.to_string())
            .unwrap_or_else(|| or_unknown(Some(&config.default_quantity)));

        ProcedureRecord {
            from_date: format_wire_date(from),
            to_date: format_wire_date(to),
            code: code_or_default(code, default_code),
            qualifier_code: config.procedure_qualifier_code.clone(),
            quantity,
            quantity_type_code: config.procedure_quantity_type_code.clone(),
        }
    };

    if claim.procedures.is_empty() {
        return vec![record(0, None)];
    }
    claim
        .procedures
        .iter()
        .enumerate()
        .map(|(index, p)| record(index, p.code.as_deref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimItem;
    use crate::ports::mock::MockResourceLookup;
    use chrono::TimeZone;
    use serde_json::json;

    fn created() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_claim_gets_synthetic_entries() {
        let config = DefaultsConfig {
            diagnosis_default_code: Some("Z00.00".to_string()),
            procedure_default_code: Some("99213".to_string()),
            ..Default::default()
        };
        let review = to_partner_format(&CanonicalClaim::new(created()), &config).service_review;

        assert_eq!(review.diagnoses.len(), 1);
        assert_eq!(review.diagnoses[0].code, "Z00.00");
        assert_eq!(review.diagnoses[0].qualifier_code, "ABK");
        assert_eq!(review.procedures.len(), 1);
        assert_eq!(review.procedures[0].code, "99213");
        assert_eq!(review.rendering_providers.len(), 1);
        assert_eq!(review.from_date, "2024-05-01");
        assert_eq!(review.to_date, "2024-05-01");
        assert_eq!(review.patient.birth_date, "2024-05-01");
    }

    #[test]
    fn test_roles_are_forced_from_config() {
        let mut claim = CanonicalClaim::new(created());
        claim.provider = Some(ClaimReference::to("Practitioner", "1234567890").with_display("Gregory House"));
        let review = to_partner_format(&claim, &DefaultsConfig::default()).service_review;

        assert_eq!(review.requesting_provider.npi, "1234567890");
        assert_eq!(review.requesting_provider.first_name, "Gregory");
        assert_eq!(review.requesting_provider.role_code, "1P");
        assert_eq!(review.rendering_providers[0].role_code, "71");
        assert_eq!(review.rendering_providers[0].npi, "1234567890");
        assert_eq!(review.rendering_providers[0].tax_id, "unknown");
    }

    #[test]
    fn test_payer_precedence() {
        let mut claim = CanonicalClaim::new(created());
        claim.insurer = Some(ClaimReference::to("Organization", "60054").with_display("Aetna"));
        let review = to_partner_format(&claim, &DefaultsConfig::default()).service_review;
        assert_eq!(review.payer.id, "60054");
        assert_eq!(review.payer.name, "Aetna");

        claim.insurer = Some(ClaimReference::default().with_identifier("BCBS01"));
        let review = to_partner_format(&claim, &DefaultsConfig::default()).service_review;
        assert_eq!(review.payer.id, "BCBS01");
        assert_eq!(review.payer.name, "unknown");

        claim.insurer = Some(
            ClaimReference::to("Organization", "org-123")
                .with_identifier("60054")
                .with_display("Aetna"),
        );
        let review = to_partner_format(&claim, &DefaultsConfig::default()).service_review;
        assert_eq!(review.payer.id, "60054");

        claim.insurer = Some(ClaimReference::default().with_display("Aetna"));
        let review = to_partner_format(&claim, &DefaultsConfig::default()).service_review;
        assert_eq!(review.payer.id, "Aetna");
    }

    #[test]
    fn test_item_periods_and_quantities() {
        let mut claim = CanonicalClaim::new(created());
        claim.add_procedure(Some("72148".into()), None, None);
        claim.add_procedure(Some("97110".into()), None, None);
        claim.add_item(ClaimItem {
            serviced_period: Some(DatePeriod {
                start: Some(date(2024, 6, 1)),
                end: None,
            }),
            quantity: Some(3),
            ..Default::default()
        });

        let review = to_partner_format(&claim, &DefaultsConfig::default()).service_review;
        assert_eq!(review.from_date, "2024-06-01");
        assert_eq!(review.to_date, "2024-06-01");
        assert_eq!(review.procedures[0].quantity, "3");
        // second procedure has no item, so it takes the top-level dates and default quantity
        assert_eq!(review.procedures[1].from_date, "2024-06-01");
        assert_eq!(review.procedures[1].quantity, "1");
        assert_eq!(review.quantity, "1");
    }

    #[test]
    fn test_fallback_window() {
        let config = DefaultsConfig {
            fallback_window_days: 30,
            ..Default::default()
        };
        let review = to_partner_format(&CanonicalClaim::new(created()), &config).service_review;
        assert_eq!(review.from_date, "2024-05-01");
        assert_eq!(review.to_date, "2024-05-31");
    }

    #[test]
    fn test_non_object_payload_maps_all_defaults() {
        let envelope = to_partner_format_json(&json!("not a claim"), &DefaultsConfig::default());
        let review = envelope.service_review;
        assert_eq!(review.payer.id, "unknown");
        assert_eq!(review.diagnoses[0].code, "unknown");
        assert_eq!(review.request_type_code, "HS");
    }

    #[test]
    fn test_json_payload_is_resequenced() {
        let payload = json!({
            "status": "active",
            "diagnoses": [{"sequence": 9, "code": "M54.5"}],
        });
        let claim = decode_claim(&payload).unwrap();
        assert_eq!(claim.diagnoses[0].sequence, 1);

        let review = to_partner_format_json(&payload, &DefaultsConfig::default()).service_review;
        assert_eq!(review.diagnoses[0].code, "M54.5");
    }

    #[test]
    fn test_malformed_item_keeps_rest_of_claim() {
        let payload = json!({
            "createdAt": "2024-05-01T09:30:00Z",
            "insurer": {"reference": "Organization/60054", "display": "Aetna"},
            "provider": {"reference": "Practitioner/1234567890", "display": "Gregory House"},
            "diagnoses": [{"code": "M54.5"}],
            "procedures": [{"code": "72148"}],
            "items": [{"servicedPeriod": {"start": "06/01/2024"}, "quantity": 2}]
        });
        let review = to_partner_format_json(&payload, &DefaultsConfig::default()).service_review;

        assert_eq!(review.payer.id, "60054");
        assert_eq!(review.requesting_provider.npi, "1234567890");
        assert_eq!(review.diagnoses[0].code, "M54.5");
        assert_eq!(review.procedures[0].code, "72148");
        assert_eq!(review.procedures[0].quantity, "2");
        assert_eq!(review.from_date, "2024-05-01");

        let payload = json!({
            "diagnoses": [{"code": "M54.5"}],
            "items": [{"quantity": -1}]
        });
        let review = to_partner_format_json(&payload, &DefaultsConfig::default()).service_review;
        assert_eq!(review.diagnoses[0].code, "M54.5");
        assert_eq!(review.procedures[0].quantity, "1");
    }

    #[tokio::test]
    async fn test_lookup_enriches_provider() {
        let lookup = MockResourceLookup::new()
            .with_practitioner(
                "Practitioner/p1",
                ProviderDetails {
                    npi: Some("1111111111".to_string()),
                    tax_id: Some("12-3456789".to_string()),
                    city: Some("Boston".to_string()),
                    ..Default::default()
                },
            )
            .await;

        let mut claim = CanonicalClaim::new(created());
        claim.provider = Some(ClaimReference::to("Practitioner", "p1").with_display("Gregory House"));

        let review = to_partner_format_with_lookup(&claim, &DefaultsConfig::default(), &lookup)
            .await
            .service_review;
        assert_eq!(review.requesting_provider.npi, "1111111111");
        assert_eq!(review.requesting_provider.tax_id, "12-3456789");
        // names come from the resolver when the lookup lacks them
        assert_eq!(review.requesting_provider.last_name, "House");
    }

    #[tokio::test]
    async fn test_failed_lookup_falls_back() {
        let lookup = MockResourceLookup::new().failing();
        let mut claim = CanonicalClaim::new(created());
        claim.patient = Some(ClaimReference::to("Patient", "M123").with_display("Jane Smith"));

        let with_lookup = to_partner_format_with_lookup(&claim, &DefaultsConfig::default(), &lookup).await;
        let without = to_partner_format(&claim, &DefaultsConfig::default());
        assert_eq!(with_lookup, without);
        assert_eq!(without.service_review.subscriber.member_id, "M123");
    }
}
