//! Prior Authorization Ports
//!
//! Port interfaces for the collaborators the prior authorization core
//! consumes but does not own:
//!
//! - **ReviewTransport**: HTTP calls to the partner's service-review API
//! - **TokenProvider**: OAuth bearer token acquisition and caching
//! - **ResourceLookup**: optional live fetch of practitioner/patient records
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_prior_auth::{ReviewEngine, DefaultsConfig};
//! use std::sync::Arc;
//!
//! let engine = ReviewEngine::new(
//!     Arc::new(PartnerHttpTransport::new(base_url)),
//!     Arc::new(CachedOAuthTokens::new(client_id, secret)),
//!     DefaultsConfig::default(),
//! )
//! .with_lookup(Arc::new(ClinicalServerLookup::new(server_url)));
//! ```

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::{DomainPort, PortError};

use crate::review::ReviewId;

/// An opaque bearer token with its expiry
///
/// The core never inspects the value. `Debug` redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Value for an `Authorization: Bearer` header
    pub fn bearer_value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the token is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Supplies bearer tokens for partner calls
#[async_trait]
pub trait TokenProvider: DomainPort {
    /// Returns a valid token, refreshing it if needed
    async fn get_token(&self) -> Result<AccessToken, PortError>;
}

/// Outcome of a submission attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResponse {
    /// Whether the partner accepted the review for processing
    pub accepted: bool,
    /// The `Location` header, when present
    pub location: Option<String>,
    pub status_code: u16,
    pub body: Value,
}

/// Outcome of a status fetch
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub status_code: u16,
    pub body: Value,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// The partner's service-review API
///
/// Implementations report partner answers (any HTTP status) as `Ok`; a
/// `PortError` means no answer was obtained at all.
#[async_trait]
pub trait ReviewTransport: DomainPort {
    /// Posts a service review payload
    async fn submit_review(
        &self,
        payload: &Value,
        token: &AccessToken,
    ) -> Result<SubmitResponse, PortError>;

    /// Fetches the current status of a submitted review
    async fn fetch_review_status(
        &self,
        review_id: &ReviewId,
        token: &AccessToken,
    ) -> Result<StatusResponse, PortError>;
}

/// Practitioner details from a live lookup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderDetails {
    pub npi: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_name: Option<String>,
    pub tax_id: Option<String>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub zip_code: Option<String>,
    pub phone: Option<String>,
}

/// Patient details from a live lookup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatientDetails {
    pub member_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Optional live lookup of referenced resources
///
/// `Ok(None)` means "not available"; the caller falls back to the
/// reference resolver.
#[async_trait]
pub trait ResourceLookup: DomainPort {
    async fn fetch_practitioner(&self, reference: &str) -> Result<Option<ProviderDetails>, PortError>;

    async fn fetch_patient(&self, reference: &str) -> Result<Option<PatientDetails>, PortError>;
}

/// Lookup that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl DomainPort for NoLookup {}

#[async_trait]
impl ResourceLookup for NoLookup {
    async fn fetch_practitioner(&self, _reference: &str) -> Result<Option<ProviderDetails>, PortError> {
        Ok(None)
    }

    async fn fetch_patient(&self, _reference: &str) -> Result<Option<PatientDetails>, PortError> {
        Ok(None)
    }
}

/// Mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use chrono::Duration;
    use serde_json::json;
    use tokio::sync::RwLock;

    /// Builds a partner status body
    pub fn status_body(code: &str, text: &str) -> Value {
        json!({ "statusCode": code, "status": text })
    }

    /// In-memory partner API with scripted status responses
    ///
    /// Status responses are served in order; once the script is exhausted
    /// the last one repeats.
    #[derive(Debug)]
    pub struct MockReviewTransport {
        submit_response: Mutex<SubmitResponse>,
        statuses: Mutex<VecDeque<StatusResponse>>,
        last_status: Mutex<StatusResponse>,
        fail_fetches: AtomicBool,
        fetch_count: AtomicUsize,
        submitted: Arc<RwLock<Vec<Value>>>,
    }

    impl Default for MockReviewTransport {
        fn default() -> Self {
            Self {
                submit_response: Mutex::new(SubmitResponse {
                    accepted: true,
                    location: Some("https://partner.example/v2/service-reviews/MOCK1".to_string()),
                    status_code: 202,
                    body: json!({}),
                }),
                statuses: Mutex::new(VecDeque::new()),
                last_status: Mutex::new(StatusResponse {
                    status_code: 200,
                    body: status_body("0", "In Process"),
                }),
                fail_fetches: AtomicBool::new(false),
                fetch_count: AtomicUsize::new(0),
                submitted: Arc::new(RwLock::new(Vec::new())),
            }
        }
    }

    impl MockReviewTransport {
        /// Creates a transport that accepts submissions and reports "In Process" forever
        pub fn new() -> Self {
            Self::default()
        }

        /// Accepts submissions with the given `Location`
        pub fn accept_with_location(self, location: impl Into<String>) -> Self {
            self.set_submit(SubmitResponse {
                accepted: true,
                location: Some(location.into()),
                status_code: 202,
                body: json!({}),
            })
        }

        /// Accepts submissions without a `Location`
        pub fn accept_without_location(self) -> Self {
            self.set_submit(SubmitResponse {
                accepted: true,
                location: None,
                status_code: 202,
                body: json!({}),
            })
        }

        /// Rejects submissions with the given status and body
        pub fn reject(self, status_code: u16, body: Value) -> Self {
            self.set_submit(SubmitResponse {
                accepted: false,
                location: None,
                status_code,
                body,
            })
        }

        /// Queues a 200 status response
        pub fn then_status(self, code: &str, text: &str) -> Self {
            self.then_response(200, status_body(code, text))
        }

        /// Queues an arbitrary status response
        pub fn then_response(self, status_code: u16, body: Value) -> Self {
            if let Ok(mut statuses) = self.statuses.lock() {
                statuses.push_back(StatusResponse { status_code, body });
            }
            self
        }

        /// Makes every status fetch fail with a connection error
        pub fn fail_status_fetches(self) -> Self {
            self.fail_fetches.store(true, Ordering::SeqCst);
            self
        }

        /// Number of status fetches made so far
        pub fn fetch_count(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }

        /// Payloads received by `submit_review`
        pub async fn submitted(&self) -> Vec<Value> {
            self.submitted.read().await.clone()
        }

        fn set_submit(self, response: SubmitResponse) -> Self {
            if let Ok(mut current) = self.submit_response.lock() {
                *current = response;
            }
            self
        }

        fn next_status(&self) -> Result<StatusResponse, PortError> {
            let mut statuses = self
                .statuses
                .lock()
                .map_err(|_| PortError::internal("status script poisoned"))?;
            let mut last = self
                .last_status
                .lock()
                .map_err(|_| PortError::internal("status script poisoned"))?;
            if let Some(next) = statuses.pop_front() {
                *last = next;
            }
            Ok(last.clone())
        }
    }

    impl DomainPort for MockReviewTransport {}

    #[async_trait]
    impl ReviewTransport for MockReviewTransport {
        async fn submit_review(
            &self,
            payload: &Value,
            _token: &AccessToken,
        ) -> Result<SubmitResponse, PortError> {
            self.submitted.write().await.push(payload.clone());
            self.submit_response
                .lock()
                .map(|response| response.clone())
                .map_err(|_| PortError::internal("submit response poisoned"))
        }

        async fn fetch_review_status(
            &self,
            review_id: &ReviewId,
            _token: &AccessToken,
        ) -> Result<StatusResponse, PortError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetches.load(Ordering::SeqCst) {
                return Err(PortError::connection(format!(
                    "connection reset fetching review {}",
                    review_id
                )));
            }
            self.next_status()
        }
    }

    /// Token provider that hands out a fixed token
    #[derive(Debug, Default)]
    pub struct StaticTokenProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StaticTokenProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// A provider whose every call fails as unauthorized
        pub fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for StaticTokenProvider {}

    #[async_trait]
    impl TokenProvider for StaticTokenProvider {
        async fn get_token(&self) -> Result<AccessToken, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PortError::unauthorized("invalid client credentials"));
            }
            Ok(AccessToken::new("mock-token", Utc::now() + Duration::minutes(5)))
        }
    }

    /// In-memory resource lookup keyed by reference string
    #[derive(Debug, Default)]
    pub struct MockResourceLookup {
        practitioners: Arc<RwLock<HashMap<String, ProviderDetails>>>,
        patients: Arc<RwLock<HashMap<String, PatientDetails>>>,
        fail: AtomicBool,
    }

    impl MockResourceLookup {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_practitioner(self, reference: impl Into<String>, details: ProviderDetails) -> Self {
            self.practitioners.write().await.insert(reference.into(), details);
            self
        }

        pub async fn with_patient(self, reference: impl Into<String>, details: PatientDetails) -> Self {
            self.patients.write().await.insert(reference.into(), details);
            self
        }

        /// Makes every lookup fail with a service-unavailable error
        pub fn failing(self) -> Self {
            self.fail.store(true, Ordering::SeqCst);
            self
        }

        fn check(&self) -> Result<(), PortError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PortError::service_unavailable("clinical-resource-server"));
            }
            Ok(())
        }
    }

    impl DomainPort for MockResourceLookup {}

    #[async_trait]
    impl ResourceLookup for MockResourceLookup {
        async fn fetch_practitioner(&self, reference: &str) -> Result<Option<ProviderDetails>, PortError> {
            self.check()?;
            Ok(self.practitioners.read().await.get(reference).cloned())
        }

        async fn fetch_patient(&self, reference: &str) -> Result<Option<PatientDetails>, PortError> {
            self.check()?;
            Ok(self.patients.read().await.get(reference).cloned())
        }
    }
}
