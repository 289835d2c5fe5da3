use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;

use super::connection;
use super::queries::{
    commodities as commodities_queries,
    user_commodities as user_commodities_queries,
    market_records as market_records_queries,
};
use super::models::{
    commodities::CommodityModel,
    user_commodities::UserCommodityDetailsModel,
    market_records::{MarketRecordModel, NewMarketRecordModel},
};
use crate::alerts::store::SubscriptionStore;
use crate::alerts::types::{CustomerDetails, Subscription, SubscriptionKey};
use crate::config::Config;
use crate::errors::AppError;

pub struct DbManager {
    pub pool: PgPool,
}

impl DbManager {
    /// Creates a new database connection pool. Run `init_db_schema` once beforehand.
    pub async fn init(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = connection::create_pool(config).await?;
        Ok(Self { pool })
    }

    pub async fn get_commodities(&self) -> Result<Vec<CommodityModel>, sqlx::Error> {
        commodities_queries::get_all_commodities(&self.pool).await
    }

    pub async fn get_symbol_id_map(&self) -> Result<HashMap<String, i32>, sqlx::Error> {
        commodities_queries::get_symbol_id_map(&self.pool).await
    }

    /// Insert records one by one inside a single transaction
    pub async fn insert_market_records(&self, records: &[NewMarketRecordModel]) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            market_records_queries::insert_market_record(&mut *tx, record).await?;
        }
        tx.commit().await?;
        debug!(count = records.len(), "Inserted market records");
        Ok(records.len())
    }

    pub async fn get_market_records_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MarketRecordModel>, sqlx::Error> {
        market_records_queries::get_market_records_in_range(&self.pool, start, end).await
    }

    pub async fn get_all_user_commodity_details(&self) -> Result<Vec<UserCommodityDetailsModel>, sqlx::Error> {
        user_commodities_queries::get_all_user_commodity_details(&self.pool).await
    }
}

#[async_trait]
impl SubscriptionStore for DbManager {
    async fn eligible_subscriptions(&self, alerted_before: DateTime<Utc>) -> Result<Vec<Subscription>, AppError> {
        let rows = user_commodities_queries::get_eligible_user_commodities(&self.pool, alerted_before).await?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn customer_details(&self, key: SubscriptionKey) -> Result<Option<CustomerDetails>, AppError> {
        let row = user_commodities_queries::get_user_commodity_details(&self.pool, key.user_id, key.commodity_id).await?;
        Ok(row.map(CustomerDetails::from))
    }

    async fn claim(
        &self,
        key: SubscriptionKey,
        alerted_before: DateTime<Utc>,
        claim_expired_before: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let claimed = user_commodities_queries::claim_user_commodity(
            &self.pool,
            key.user_id,
            key.commodity_id,
            alerted_before,
            claim_expired_before,
        )
        .await?;
        Ok(claimed)
    }

    async fn release_claim(&self, key: SubscriptionKey) -> Result<(), AppError> {
        user_commodities_queries::release_claim(&self.pool, key.user_id, key.commodity_id).await?;
        Ok(())
    }

    async fn record_alerted(&self, key: SubscriptionKey, alerted_at: DateTime<Utc>) -> Result<(), AppError> {
        user_commodities_queries::set_alerted_at(&self.pool, key.user_id, key.commodity_id, alerted_at).await?;
        Ok(())
    }
}
