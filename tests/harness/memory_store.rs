use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use pivot_point::alerts::store::SubscriptionStore;
use pivot_point::alerts::types::{CustomerDetails, Subscription, SubscriptionKey};
use pivot_point::errors::AppError;

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub subscription: Subscription,
    pub details: Option<CustomerDetails>,
    pub claimed_at: Option<DateTime<Utc>>,
}

/// `user_commodities` in memory, with the same claim rules as the SQL update
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<BTreeMap<(i32, i32), StoredRow>>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_records: Arc<Mutex<bool>>,
    failing_details: Arc<Mutex<HashSet<(i32, i32)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription whose user reads `{name}@example.com`
    pub fn add(&self, user_id: i32, commodity_id: i32, buy: Option<Decimal>, sell: Option<Decimal>, name: &str) {
        let subscription = Subscription {
            user_id,
            commodity_id,
            buy_price: buy,
            sell_price: sell,
            last_alerted_at: None,
        };
        let details = CustomerDetails {
            email: format!("{}@example.com", name),
            user_name: name.to_string(),
            symbol: format!("SYM{}", commodity_id),
            commodity_name: format!("Commodity {}", commodity_id),
        };
        self.rows.lock().expect("lock rows").insert(
            (user_id, commodity_id),
            StoredRow { subscription, details: Some(details), claimed_at: None },
        );
    }

    pub fn remove_details(&self, user_id: i32, commodity_id: i32) {
        if let Some(row) = self.rows.lock().expect("lock rows").get_mut(&(user_id, commodity_id)) {
            row.details = None;
        }
    }

    pub fn set_claimed_at(&self, user_id: i32, commodity_id: i32, claimed_at: DateTime<Utc>) {
        if let Some(row) = self.rows.lock().expect("lock rows").get_mut(&(user_id, commodity_id)) {
            row.claimed_at = Some(claimed_at);
        }
    }

    pub fn set_alerted_at(&self, user_id: i32, commodity_id: i32, alerted_at: DateTime<Utc>) {
        if let Some(row) = self.rows.lock().expect("lock rows").get_mut(&(user_id, commodity_id)) {
            row.subscription.last_alerted_at = Some(alerted_at);
        }
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().expect("lock flag") = true;
    }

    /// Makes the customer lookup for one subscription return an error
    pub fn fail_details_for(&self, user_id: i32, commodity_id: i32) {
        self.failing_details.lock().expect("lock failing details").insert((user_id, commodity_id));
    }

    pub fn fail_records(&self) {
        *self.fail_records.lock().expect("lock flag") = true;
    }

    pub fn row(&self, user_id: i32, commodity_id: i32) -> StoredRow {
        self.rows
            .lock()
            .expect("lock rows")
            .get(&(user_id, commodity_id))
            .cloned()
            .expect("row exists")
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn eligible_subscriptions(&self, alerted_before: DateTime<Utc>) -> Result<Vec<Subscription>, AppError> {
        if *self.fail_reads.lock().expect("lock flag") {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .rows
            .lock()
            .expect("lock rows")
            .values()
            .map(|row| row.subscription.clone())
            .filter(|s| s.has_threshold())
            .filter(|s| s.last_alerted_at.map_or(true, |at| at < alerted_before))
            .collect())
    }

    async fn customer_details(&self, key: SubscriptionKey) -> Result<Option<CustomerDetails>, AppError> {
        if self.failing_details.lock().expect("lock failing details").contains(&(key.user_id, key.commodity_id)) {
            return Err(AppError::Database(sqlx::Error::RowNotFound));
        }
        Ok(self
            .rows
            .lock()
            .expect("lock rows")
            .get(&(key.user_id, key.commodity_id))
            .and_then(|row| row.details.clone()))
    }

    async fn claim(
        &self,
        key: SubscriptionKey,
        alerted_before: DateTime<Utc>,
        claim_expired_before: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().expect("lock rows");
        let Some(row) = rows.get_mut(&(key.user_id, key.commodity_id)) else {
            return Ok(false);
        };
        let cooled_down = row.subscription.last_alerted_at.map_or(true, |at| at < alerted_before);
        let unclaimed = row.claimed_at.map_or(true, |at| at < claim_expired_before);
        if cooled_down && unclaimed {
            row.claimed_at = Some(Utc::now());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release_claim(&self, key: SubscriptionKey) -> Result<(), AppError> {
        if let Some(row) = self.rows.lock().expect("lock rows").get_mut(&(key.user_id, key.commodity_id)) {
            row.claimed_at = None;
        }
        Ok(())
    }

    async fn record_alerted(&self, key: SubscriptionKey, alerted_at: DateTime<Utc>) -> Result<(), AppError> {
        if *self.fail_records.lock().expect("lock flag") {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        if let Some(row) = self.rows.lock().expect("lock rows").get_mut(&(key.user_id, key.commodity_id)) {
            row.subscription.last_alerted_at = Some(alerted_at);
            row.claimed_at = None;
        }
        Ok(())
    }
}
