//! Outstanding review tracking
//!
//! A concurrency-safe keyed store for callers that drive many reviews at
//! once. The engine itself never touches it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::PriorAuthError;
use crate::review::{ReviewId, ReviewRequestState, StatusSnapshot};

/// Shared store of review states keyed by review id
#[derive(Debug, Clone, Default)]
pub struct ReviewTracker {
    reviews: Arc<RwLock<HashMap<ReviewId, ReviewRequestState>>>,
}

impl ReviewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a review, replacing any previous state for its id
    pub async fn track(&self, state: ReviewRequestState) -> Option<ReviewRequestState> {
        self.reviews.write().await.insert(state.id.clone(), state)
    }

    pub async fn get(&self, id: &ReviewId) -> Option<ReviewRequestState> {
        self.reviews.read().await.get(id).cloned()
    }

    /// Applies a status snapshot to a tracked review
    pub async fn record(&self, snapshot: &StatusSnapshot) -> Result<ReviewRequestState, PriorAuthError> {
        let mut reviews = self.reviews.write().await;
        let state = reviews
            .get_mut(&snapshot.review_id)
            .ok_or_else(|| PriorAuthError::UntrackedReview(snapshot.review_id.clone()))?;
        state.record(snapshot)?;
        Ok(state.clone())
    }

    /// Replaces the state of a tracked review
    pub async fn update(&self, state: ReviewRequestState) -> Result<(), PriorAuthError> {
        let mut reviews = self.reviews.write().await;
        match reviews.get_mut(&state.id) {
            Some(existing) => {
                *existing = state;
                Ok(())
            }
            None => Err(PriorAuthError::UntrackedReview(state.id)),
        }
    }

    pub async fn remove(&self, id: &ReviewId) -> Option<ReviewRequestState> {
        self.reviews.write().await.remove(id)
    }

    /// Reviews that have not reached a terminal status
    pub async fn outstanding(&self) -> Vec<ReviewRequestState> {
        let mut outstanding: Vec<_> = self
            .reviews
            .read()
            .await
            .values()
            .filter(|state| !state.is_terminal())
            .cloned()
            .collect();
        outstanding.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        outstanding
    }

    /// Every tracked review, oldest submission first
    pub async fn all(&self) -> Vec<ReviewRequestState> {
        let mut all: Vec<_> = self.reviews.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        all
    }

    pub async fn len(&self) -> usize {
        self.reviews.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reviews.read().await.is_empty()
    }
}
