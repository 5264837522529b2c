//! Pre-built Test Fixtures
//!
//! Provides ready-to-use claims, partner payloads, and status bodies.
//! These fixtures are consistent and predictable across test suites.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use domain_prior_auth::{CanonicalClaim, ClaimItem, ClaimReference, DefaultsConfig};
use core_kernel::DatePeriod;

/// Fixture for canonical claims
pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Claim creation instant (May 1, 2024)
    pub fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    /// Service period start (June 1, 2024)
    pub fn service_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    /// Service period end (June 30, 2024)
    pub fn service_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    /// A lumbar MRI request with full references, two diagnoses and one procedure
    pub fn lumbar_mri() -> CanonicalClaim {
        let mut claim = CanonicalClaim::new(Self::created_at());
        claim.id = Some("CLM-LUMBAR-MRI".to_string());
        claim.patient = Some(ClaimReference::to("Patient", "W123456789").with_display("Jane Smith"));
        claim.provider = Some(ClaimReference::to("Practitioner", "1234567890").with_display("Gregory House"));
        claim.insurer = Some(ClaimReference::to("Organization", "60054").with_display("Aetna"));
        claim.patient_birth_date = NaiveDate::from_ymd_opt(1980, 2, 29);
        claim.add_diagnosis(Some("M54.5".to_string()), Some(DefaultsConfig::default().diagnosis_code_system));
        claim.add_diagnosis(Some("M51.26".to_string()), Some(DefaultsConfig::default().diagnosis_code_system));
        claim.add_procedure(Some("72148".to_string()), Some(DefaultsConfig::default().procedure_code_system), None);
        claim.add_item(ClaimItem {
            product_code: Some("72148".to_string()),
            serviced_period: Some(DatePeriod {
                start: Some(Self::service_start()),
                end: Some(Self::service_end()),
            }),
            quantity: Some(1),
            ..Default::default()
        });
        claim.add_insurance(true, ClaimReference::to("Coverage", "W123456789"));
        claim
    }

    /// An active claim with nothing but a creation date
    pub fn empty() -> CanonicalClaim {
        CanonicalClaim::new(Self::created_at())
    }
}

/// Fixture for partner service-review payloads and status bodies
pub struct ReviewFixtures;

impl ReviewFixtures {
    /// Location header returned for an accepted submission
    pub fn location() -> &'static str {
        "https://api.partner.example/v2/service-reviews/ABC123"
    }

    /// A wrapped partner service review
    pub fn wrapped_review() -> Value {
        json!({ "serviceReview": Self::bare_review() })
    }

    /// A bare partner service review
    pub fn bare_review() -> Value {
        json!({
            "payer": {"id": "60054", "name": "Aetna"},
            "requestingProvider": {
                "npi": "1234567890",
                "firstName": "Gregory",
                "lastName": "House",
                "roleCode": "1P"
            },
            "subscriber": {"memberId": "W123456789", "firstName": "Jane", "lastName": "Smith"},
            "patient": {
                "firstName": "Jane",
                "lastName": "Smith",
                "subscriberRelationshipCode": "18",
                "birthDate": "1980-02-29"
            },
            "diagnoses": [
                {"qualifierCode": "ABK", "code": "M54.5"},
                {"qualifierCode": "ABF", "code": "M51.26"}
            ],
            "procedures": [
                {
                    "fromDate": "2024-06-01",
                    "toDate": "2024-06-30",
                    "code": "72148",
                    "qualifierCode": "HC",
                    "quantity": "1",
                    "quantityTypeCode": "UN"
                }
            ],
            "requestTypeCode": "HS",
            "serviceTypeCode": "73",
            "placeOfServiceCode": "22",
            "serviceLevelCode": "E",
            "fromDate": "2024-06-01",
            "toDate": "2024-06-30",
            "quantity": "1",
            "quantityTypeCode": "VS"
        })
    }

    /// A rejection body carrying validation messages
    pub fn rejection_body() -> Value {
        json!({
            "userMessage": "The request is invalid",
            "validationMessages": [
                {"field": "subscriber.memberId", "errorMessage": "memberId is required"},
                "payer.id is not a valid payer"
            ]
        })
    }

    /// Status body for a review still in process
    pub fn in_process() -> Value {
        json!({"statusCode": "0", "status": "In Process"})
    }

    /// Status body for a pended (terminal) review
    pub fn pended() -> Value {
        json!({
            "statusCode": "A4",
            "status": "Pended",
            "statusReasons": [{"code": "A1", "value": "Clinical review required"}]
        })
    }
}
