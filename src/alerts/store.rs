use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{CustomerDetails, Subscription, SubscriptionKey};
use crate::errors::AppError;

/// Persistence the alert pipeline reads from and writes back to.
///
/// `claim` is the atomic step that keeps overlapping runs from mailing the
/// same subscription twice: it succeeds for at most one caller until the claim
/// is released, recorded, or older than `claim_expired_before`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Subscriptions with a threshold that were never alerted, or last alerted
    /// before `alerted_before`
    async fn eligible_subscriptions(&self, alerted_before: DateTime<Utc>) -> Result<Vec<Subscription>, AppError>;

    /// User and commodity display fields, `None` when either join is missing
    async fn customer_details(&self, key: SubscriptionKey) -> Result<Option<CustomerDetails>, AppError>;

    async fn claim(
        &self,
        key: SubscriptionKey,
        alerted_before: DateTime<Utc>,
        claim_expired_before: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    async fn release_claim(&self, key: SubscriptionKey) -> Result<(), AppError>;

    /// Set `alerted_at` and clear the claim after a delivered alert
    async fn record_alerted(&self, key: SubscriptionKey, alerted_at: DateTime<Utc>) -> Result<(), AppError>;
}
