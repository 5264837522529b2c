//! Reference resolution
//!
//! Derives an identifier and a best-effort first/last name split from a
//! loosely-typed reference. Never fails; anything underivable is `"unknown"`.

use serde::{Deserialize, Serialize};

use crate::claim::ClaimReference;
use crate::ports::{PatientDetails, ProviderDetails};
use crate::service_review::UNKNOWN;

/// Identifier and name parts extracted from a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReference {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// The full display name, when one was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Resolves a reference into an id and a first/last name split
///
/// The display name is split on its first whitespace run. A single-token
/// display becomes the last name with an unknown first name.
pub fn resolve(reference: &ClaimReference) -> ResolvedReference {
    let id = reference
        .reference_str()
        .and_then(last_segment)
        .or_else(|| reference.identifier_str())
        .unwrap_or(UNKNOWN)
        .to_string();

    let display = reference.display_str();
    let (first_name, last_name) = match display {
        Some(name) => match name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
            None => (UNKNOWN.to_string(), name.to_string()),
        },
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    };

    ResolvedReference {
        id,
        first_name,
        last_name,
        display: display.map(str::to_string),
    }
}

/// Resolves an optional reference, treating absence like an empty reference
pub fn resolve_opt(reference: Option<&ClaimReference>) -> ResolvedReference {
    match reference {
        Some(r) => resolve(r),
        None => resolve(&ClaimReference::default()),
    }
}

/// Last segment of a slash-delimited reference
///
/// A reference ending in `/` names no resource and yields nothing.
fn last_segment(reference: &str) -> Option<&str> {
    reference
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

impl From<ResolvedReference> for ProviderDetails {
    fn from(resolved: ResolvedReference) -> Self {
        ProviderDetails {
            npi: Some(resolved.id),
            first_name: Some(resolved.first_name),
            last_name: Some(resolved.last_name),
            contact_name: resolved.display,
            ..Default::default()
        }
    }
}

impl From<ResolvedReference> for PatientDetails {
    fn from(resolved: ResolvedReference) -> Self {
        PatientDetails {
            member_id: Some(resolved.id),
            first_name: Some(resolved.first_name),
            last_name: Some(resolved.last_name),
            birth_date: None,
        }
    }
}
