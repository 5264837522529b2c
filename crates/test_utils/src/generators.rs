//! Property-Based Test Generators
//!
//! Provides proptest strategies for canonical claims and their parts.

use chrono::{Days, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use core_kernel::DatePeriod;
use domain_prior_auth::{CanonicalClaim, ClaimItem, ClaimReference};

/// Strategy for ICD-10 style diagnosis codes
pub fn diagnosis_code_strategy() -> impl Strategy<Value = String> {
    "[A-Z][0-9]{2}(\\.[0-9]{1,2})?"
}

/// Strategy for CPT style procedure codes
pub fn procedure_code_strategy() -> impl Strategy<Value = String> {
    "[0-9]{5}"
}

/// Strategy for display names: one to three words, or none
pub fn display_name_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(
        proptest::collection::vec("[A-Z][a-z]{1,9}", 1..=3).prop_map(|words| words.join(" ")),
    )
}

/// Strategy for loosely-typed references
pub fn reference_strategy(resource_type: &'static str) -> impl Strategy<Value = ClaimReference> {
    (
        proptest::option::of("[A-Za-z0-9]{1,12}"),
        proptest::option::of("[A-Za-z0-9]{1,12}"),
        display_name_strategy(),
    )
        .prop_map(move |(id, identifier, display)| ClaimReference {
            reference: id.map(|id| format!("{}/{}", resource_type, id)),
            identifier,
            display,
        })
}

/// Strategy for service dates in 2020-2029
pub fn service_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|base| base.checked_add_days(Days::new(offset)))
            .unwrap_or_default()
    })
}

/// Strategy for line items with optional, well-ordered periods
pub fn item_strategy() -> impl Strategy<Value = ClaimItem> {
    (
        procedure_code_strategy(),
        proptest::option::of((service_date_strategy(), 0u64..90)),
        proptest::option::of(1u32..20),
    )
        .prop_map(|(code, period, quantity)| ClaimItem {
            product_code: Some(code),
            serviced_period: period.map(|(start, len)| DatePeriod {
                start: Some(start),
                end: start.checked_add_days(Days::new(len)),
            }),
            quantity,
            ..Default::default()
        })
}

/// Strategy for claims with at least one coded diagnosis and procedure
pub fn coded_claim_strategy() -> impl Strategy<Value = CanonicalClaim> {
    (
        proptest::collection::vec(diagnosis_code_strategy(), 1..6),
        proptest::collection::vec(procedure_code_strategy(), 1..6),
        proptest::collection::vec(item_strategy(), 0..6),
        proptest::option::of(reference_strategy("Patient")),
        proptest::option::of(reference_strategy("Practitioner")),
        proptest::option::of(reference_strategy("Organization")),
    )
        .prop_map(|(diagnoses, procedures, items, patient, provider, insurer)| {
            let mut claim = CanonicalClaim::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
            claim.patient = patient;
            claim.provider = provider;
            claim.insurer = insurer;
            for code in diagnoses {
                claim.add_diagnosis(Some(code), None);
            }
            for code in procedures {
                claim.add_procedure(Some(code), None, None);
            }
            for item in items {
                claim.add_item(item);
            }
            claim
        })
}

/// Strategy for arbitrary claims, including empty lists and blank codes
pub fn any_claim_strategy() -> impl Strategy<Value = CanonicalClaim> {
    (
        proptest::collection::vec(proptest::option::of("[ A-Z0-9.]{0,6}"), 0..4),
        proptest::collection::vec(proptest::option::of("[ 0-9]{0,5}"), 0..4),
        proptest::collection::vec(item_strategy(), 0..4),
        proptest::option::of(reference_strategy("Patient")),
        proptest::option::of(reference_strategy("Practitioner")),
        proptest::option::of(reference_strategy("Organization")),
        any::<bool>(),
    )
        .prop_map(|(diagnoses, procedures, items, patient, provider, insurer, has_created)| {
            let mut claim = CanonicalClaim {
                patient,
                provider,
                insurer,
                ..Default::default()
            };
            if has_created {
                claim.created_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
            }
            for code in diagnoses {
                claim.add_diagnosis(code, None);
            }
            for code in procedures {
                claim.add_procedure(code, None, None);
            }
            for item in items {
                claim.add_item(item);
            }
            claim
        })
}
