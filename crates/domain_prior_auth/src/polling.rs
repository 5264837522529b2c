//! Submission and status polling
//!
//! ```text
//! SUBMITTING ──accepted + Location──> IN_PROCESS ──poll──> COMPLETE
//!     │                                   │  ▲              ERROR
//!     └──anything else──> error           └──┘              ERROR_TIMEOUT_FROM_PLAN
//!                                      (sleep, retry)       <unrecognized code>
//!                                           │
//!                                           └──attempts exhausted──> POLL_TIMEOUT
//! ```
//!
//! Submission is never retried here; re-submitting risks a duplicate review.
//! A failed status fetch ends polling immediately. Only an `IN_PROCESS`
//! answer is retried, after a mandatory delay.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use core_kernel::PortError;

use crate::claim::CanonicalClaim;
use crate::defaults::DefaultsConfig;
use crate::error::{MappingError, PriorAuthError};
use crate::outbound::to_partner_format_with_lookup;
use crate::ports::{AccessToken, NoLookup, ResourceLookup, ReviewTransport, TokenProvider};
use crate::review::{validation_messages, ReviewId, ReviewRequestState, StatusSnapshot};
use crate::service_review::ServiceReviewEnvelope;
use crate::status::InternalStatus;

/// Polling limits and inter-attempt delay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Maximum number of status fetches
    pub max_attempts: u32,
    /// Delay before the second fetch, in milliseconds
    pub delay_ms: u64,
    /// Growth factor applied to the delay after each further fetch
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 5_000,
            backoff_multiplier: 1.0,
            max_delay_ms: 60_000,
        }
    }
}

impl PollPolicy {
    /// A policy with a constant delay
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            max_attempts,
            delay_ms,
            backoff_multiplier: 1.0,
            max_delay_ms: delay_ms,
        }
    }

    /// Delay to wait before the given 1-based attempt
    ///
    /// The first attempt is immediate.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let multiplier = if self.backoff_multiplier.is_finite() {
            self.backoff_multiplier.max(1.0)
        } else {
            1.0
        };
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let scaled = self.delay_ms as f64 * multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Orchestrates submit-then-poll against the partner API
///
/// Holds no per-review state; every call works on the state it is given or
/// returns, so independent reviews can be driven concurrently.
pub struct ReviewEngine {
    transport: Arc<dyn ReviewTransport>,
    tokens: Arc<dyn TokenProvider>,
    lookup: Arc<dyn ResourceLookup>,
    defaults: DefaultsConfig,
}

impl ReviewEngine {
    /// Creates an engine that maps claims from their own data only
    pub fn new(
        transport: Arc<dyn ReviewTransport>,
        tokens: Arc<dyn TokenProvider>,
        defaults: DefaultsConfig,
    ) -> Self {
        Self {
            transport,
            tokens,
            lookup: Arc::new(NoLookup),
            defaults,
        }
    }

    /// Enriches mapped claims with a live resource lookup
    pub fn with_lookup(mut self, lookup: Arc<dyn ResourceLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    /// Submits a service review and returns the partner-assigned id
    #[instrument(skip(self, envelope))]
    pub async fn submit(&self, envelope: &ServiceReviewEnvelope) -> Result<ReviewId, PriorAuthError> {
        let payload = serde_json::to_value(envelope).map_err(MappingError::Encode)?;
        debug!(payload = %payload, "Submitting service review");

        let token = self
            .tokens
            .get_token()
            .await
            .map_err(PriorAuthError::SubmissionTransport)?;
        let response = self
            .transport
            .submit_review(&payload, &token)
            .await
            .map_err(|e| {
                warn!(error = %e, transient = e.is_transient(), "Service review submission failed");
                PriorAuthError::SubmissionTransport(e)
            })?;

        if !response.accepted {
            let validation_messages = validation_messages(&response.body);
            warn!(
                status_code = response.status_code,
                messages = validation_messages.len(),
                "Service review rejected"
            );
            return Err(PriorAuthError::SubmissionRejected {
                status_code: response.status_code,
                body: response.body,
                validation_messages,
            });
        }

        match response.location.as_deref().and_then(ReviewId::from_location) {
            Some(review_id) => {
                info!(review_id = %review_id, status_code = response.status_code, "Service review accepted");
                Ok(review_id)
            }
            None => Err(PriorAuthError::MissingLocation {
                status_code: response.status_code,
                body: response.body,
            }),
        }
    }

    /// Maps a canonical claim, submits it, and returns the fresh review state
    #[instrument(skip(self, claim), fields(claim_id = claim.id.as_deref().unwrap_or("-")))]
    pub async fn submit_claim(&self, claim: &CanonicalClaim) -> Result<ReviewRequestState, PriorAuthError> {
        let envelope = to_partner_format_with_lookup(claim, &self.defaults, self.lookup.as_ref()).await;
        let review_id = self.submit(&envelope).await?;
        Ok(ReviewRequestState::new(review_id))
    }

    /// Fetches and normalizes the current status once
    #[instrument(skip(self, review_id), fields(review_id = %review_id))]
    pub async fn poll_once(&self, review_id: &ReviewId) -> Result<StatusSnapshot, PriorAuthError> {
        let token = self.token_for(review_id).await?;
        let response = self
            .transport
            .fetch_review_status(review_id, &token)
            .await
            .map_err(|source| {
                warn!(error = %source, transient = source.is_transient(), "Status fetch failed");
                PriorAuthError::PollingTransport {
                    review_id: review_id.clone(),
                    source,
                }
            })?;

        if !response.is_success() {
            warn!(status_code = response.status_code, "Status fetch rejected");
            return Err(PriorAuthError::StatusRejected {
                review_id: review_id.clone(),
                status_code: response.status_code,
                body: response.body,
            });
        }

        let snapshot = StatusSnapshot::from_body(review_id.clone(), response.status_code, response.body);
        debug!(status = %snapshot.status, raw_code = %snapshot.raw_code, "Fetched review status");
        Ok(snapshot)
    }

    /// Polls a review until it is terminal or attempts run out
    pub async fn poll_until_terminal(
        &self,
        review_id: &ReviewId,
        policy: &PollPolicy,
    ) -> Result<ReviewRequestState, PriorAuthError> {
        let mut state = ReviewRequestState::new(review_id.clone());
        self.drive(&mut state, policy, None).await?;
        Ok(state)
    }

    /// Like [`poll_until_terminal`](Self::poll_until_terminal), stopping when
    /// `cancel` turns true
    pub async fn poll_until_terminal_with_cancel(
        &self,
        review_id: &ReviewId,
        policy: &PollPolicy,
        cancel: watch::Receiver<bool>,
    ) -> Result<ReviewRequestState, PriorAuthError> {
        let mut state = ReviewRequestState::new(review_id.clone());
        self.drive(&mut state, policy, Some(cancel)).await?;
        Ok(state)
    }

    /// Continues polling an existing state in place
    ///
    /// Attempts are counted per call. A state that is already terminal is
    /// returned untouched.
    pub async fn poll_state(
        &self,
        state: &mut ReviewRequestState,
        policy: &PollPolicy,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<(), PriorAuthError> {
        self.drive(state, policy, cancel).await
    }

    /// Submits a claim and polls the resulting review to a terminal status
    pub async fn submit_and_poll(
        &self,
        claim: &CanonicalClaim,
        policy: &PollPolicy,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<ReviewRequestState, PriorAuthError> {
        let mut state = self.submit_claim(claim).await?;
        self.drive(&mut state, policy, cancel).await?;
        Ok(state)
    }

    #[instrument(skip(self, state, policy, cancel), fields(review_id = %state.id, max_attempts = policy.max_attempts))]
    async fn drive(
        &self,
        state: &mut ReviewRequestState,
        policy: &PollPolicy,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<(), PriorAuthError> {
        let mut attempts: u32 = 0;

        while state.internal_status == InternalStatus::InProcess && attempts < policy.max_attempts {
            let attempt = attempts + 1;
            let delay = policy.delay_before(attempt);
            if !delay.is_zero() {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before next status fetch");
            }
            if wait(delay, cancel.as_mut()).await {
                info!(attempts, "Polling cancelled");
                return Err(PriorAuthError::Cancelled {
                    review_id: state.id.clone(),
                    attempts,
                });
            }

            let snapshot = self.poll_once(&state.id).await?;
            attempts = attempt;
            state.record(&snapshot)?;
            info!(attempt, status = %state.internal_status, "Polled review status");
        }

        if state.internal_status == InternalStatus::InProcess {
            warn!(attempts, "Review still in process after final attempt");
            state.mark_poll_timeout()?;
        }
        Ok(())
    }

    async fn token_for(&self, review_id: &ReviewId) -> Result<AccessToken, PriorAuthError> {
        self.tokens
            .get_token()
            .await
            .map_err(|source: PortError| PriorAuthError::PollingTransport {
                review_id: review_id.clone(),
                source,
            })
    }
}

/// Sleeps for `delay` unless cancelled first; returns true on cancellation
///
/// Cancellation is checked even when `delay` is zero, so it also guards
/// the first fetch. A dropped sender means cancellation can no longer
/// happen and the full delay is served.
async fn wait(delay: Duration, cancel: Option<&mut watch::Receiver<bool>>) -> bool {
    let Some(cancel) = cancel else {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        return false;
    };

    if *cancel.borrow() {
        return true;
    }
    if delay.is_zero() {
        return false;
    }

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return *cancel.borrow(),
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => return true,
                Ok(()) => continue,
                Err(_) => {
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_delays() {
        let policy = PollPolicy::fixed(3, Duration::from_millis(500));
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy {
            max_attempts: 10,
            delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
        };
        assert_eq!(policy.delay_before(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_before(3), Duration::from_millis(2_000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(4_000));
        assert_eq!(policy.delay_before(5), Duration::from_millis(5_000));
        assert_eq!(policy.delay_before(40), Duration::from_millis(5_000));
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay_before(7), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_observes_cancel() {
        let (tx, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let cancelled = wait(Duration::from_secs(60), Some(&mut rx)).await;
            (cancelled, rx)
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
        let (cancelled, _rx) = handle.await.unwrap();
        assert!(cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_with_dropped_sender_serves_delay() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let start = tokio::time::Instant::now();
        assert!(!wait(Duration::from_secs(2), Some(&mut rx)).await);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
