//! Prior Authorization Domain
//!
//! This crate bridges a canonical clinical prior-authorization claim and a
//! partner's proprietary service-review API, and tracks a submitted review
//! until the partner reports a terminal outcome.
//!
//! # Data Flow
//!
//! ```text
//! CanonicalClaim -> outbound -> ServiceReview -> ReviewTransport (external)
//!                                                     │
//!                               ReviewId <────────────┘
//!                                  │
//!                   ReviewEngine::poll_until_terminal -> status::normalize
//!
//! partner payload -> inbound -> CanonicalClaim
//! ```
//!
//! The mapping functions are total: missing data degrades to configured
//! defaults or `"unknown"` and never surfaces as an error. Only the JSON
//! boundary (`MappingError`) and the partner interaction (`PriorAuthError`)
//! can fail.

pub mod claim;
pub mod service_review;
pub mod defaults;
pub mod reference;
pub mod outbound;
pub mod inbound;
pub mod status;
pub mod review;
pub mod polling;
pub mod tracker;
pub mod ports;
pub mod error;

pub use claim::{
    CanonicalClaim, ClaimStatus, ClaimUse, ClaimReference,
    ClaimDiagnosis, ClaimProcedure, ClaimItem, ClaimInsurance,
};
pub use service_review::{
    ServiceReview, ServiceReviewEnvelope, ReceivedServiceReview, UNKNOWN,
    Payer, ProviderRecord, Subscriber, PatientRecord, DiagnosisRecord, ProcedureRecord,
};
pub use defaults::DefaultsConfig;
pub use reference::{resolve, resolve_opt, ResolvedReference};
pub use outbound::{
    to_partner_format, to_partner_format_json, to_partner_format_with_lookup, decode_claim,
};
pub use inbound::{to_canonical, review_to_canonical};
pub use status::{normalize, InternalStatus};
pub use review::{ReviewId, ReviewRequestState, StatusSnapshot, StatusReason};
pub use polling::{PollPolicy, ReviewEngine};
pub use tracker::ReviewTracker;
pub use ports::{
    AccessToken, TokenProvider, ReviewTransport, SubmitResponse, StatusResponse,
    ResourceLookup, NoLookup, ProviderDetails, PatientDetails,
};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockReviewTransport, StaticTokenProvider, MockResourceLookup};
pub use error::{MappingError, PriorAuthError, FailureTier};
