use rust_decimal::Decimal;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One stored quote joined with its commodity symbol
#[derive(Debug, Clone, FromRow)]
pub struct MarketRecordModel {
    pub market_record_id: i64,
    pub commodity_id: i32,
    pub symbol: String,
    pub commodity_name: String,
    pub recorded_at: DateTime<Utc>,
    pub price: Decimal,
    pub volume: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub change_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMarketRecordModel {
    pub commodity_id: i32,
    pub recorded_at: DateTime<Utc>,
    pub price: Decimal,
    pub volume: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percentage: Option<Decimal>,
    pub open_price: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub price_avg_50: Option<Decimal>,
    pub price_avg_200: Option<Decimal>,
    pub year_high: Option<Decimal>,
    pub year_low: Option<Decimal>,
    pub ingested_at: DateTime<Utc>,
}
