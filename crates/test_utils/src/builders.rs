//! Test Data Builders
//!
//! Builder for canonical claims with sensible defaults. Tests specify only
//! the fields they care about.

use chrono::{DateTime, NaiveDate, Utc};

use core_kernel::DatePeriod;
use domain_prior_auth::{CanonicalClaim, ClaimItem, ClaimReference, ClaimStatus};

use crate::fixtures::ClaimFixtures;

/// Builder for constructing canonical claims
pub struct ClaimBuilder {
    claim: CanonicalClaim,
}

impl Default for ClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimBuilder {
    /// Creates a builder for an empty active claim
    pub fn new() -> Self {
        Self {
            claim: ClaimFixtures::empty(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.claim.id = Some(id.into());
        self
    }

    pub fn status(mut self, status: ClaimStatus) -> Self {
        self.claim.status = status;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.claim.created_at = Some(created_at);
        self
    }

    /// Removes the creation date
    pub fn without_created_at(mut self) -> Self {
        self.claim.created_at = None;
        self
    }

    /// Sets the patient as `Patient/<id>` with a display name
    pub fn patient(mut self, id: &str, display: &str) -> Self {
        self.claim.patient = Some(ClaimReference::to("Patient", id).with_display(display));
        self
    }

    pub fn patient_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.claim.patient_birth_date = Some(birth_date);
        self
    }

    /// Sets the provider as `Practitioner/<npi>` with a display name
    pub fn provider(mut self, npi: &str, display: &str) -> Self {
        self.claim.provider = Some(ClaimReference::to("Practitioner", npi).with_display(display));
        self
    }

    /// Sets the provider reference as given
    pub fn provider_reference(mut self, reference: ClaimReference) -> Self {
        self.claim.provider = Some(reference);
        self
    }

    /// Sets the insurer as `Organization/<id>` with a display name
    pub fn insurer(mut self, id: &str, name: &str) -> Self {
        self.claim.insurer = Some(ClaimReference::to("Organization", id).with_display(name));
        self
    }

    pub fn diagnosis(mut self, code: &str) -> Self {
        self.claim.add_diagnosis(Some(code.to_string()), None);
        self
    }

    /// Adds a diagnosis that carries no code
    pub fn uncoded_diagnosis(mut self) -> Self {
        self.claim.add_diagnosis(None, None);
        self
    }

    pub fn procedure(mut self, code: &str) -> Self {
        self.claim.add_procedure(Some(code.to_string()), None, None);
        self
    }

    /// Adds a line item for `code` with an optional period and quantity
    pub fn item(mut self, code: &str, period: Option<(NaiveDate, NaiveDate)>, quantity: Option<u32>) -> Self {
        self.claim.add_item(ClaimItem {
            product_code: Some(code.to_string()),
            serviced_period: period.map(|(start, end)| DatePeriod {
                start: Some(start),
                end: Some(end),
            }),
            quantity,
            ..Default::default()
        });
        self
    }

    pub fn coverage(mut self, member_id: &str) -> Self {
        self.claim.add_insurance(true, ClaimReference::to("Coverage", member_id));
        self
    }

    pub fn build(self) -> CanonicalClaim {
        self.claim
    }
}
