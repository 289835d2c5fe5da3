use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// One element of the `stable/quote` response.
/// `name`, `exchange` and `marketCap` are not stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmpQuote {
    pub symbol: String,
    pub price: Option<Decimal>,
    pub change_percentage: Option<Decimal>,
    pub change: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub year_high: Option<Decimal>,
    pub year_low: Option<Decimal>,
    pub price_avg_50: Option<Decimal>,
    pub price_avg_200: Option<Decimal>,
    pub open: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub timestamp: Option<i64>, // Unix seconds
}

/// One element of the `stable/historical-price-eod/full` response
#[derive(Debug, Clone, Deserialize)]
pub struct FmpHistoricalPrice {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub change: Option<Decimal>,
    #[serde(rename = "changePercent")]
    pub change_percent: Option<Decimal>,
}
