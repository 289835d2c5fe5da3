use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

use super::fmp_types::{FmpHistoricalPrice, FmpQuote};
use crate::alerts::types::{PriceEntry, PriceSnapshot};
use crate::db::models::market_records::NewMarketRecordModel;
use crate::errors::AppError;

/// Map API quotes onto `market_records` rows.
///
/// Quotes whose symbol is not a tracked commodity, or that lack a usable
/// price or timestamp, are dropped with a warning.
pub fn quotes_to_records(
    quotes: Vec<FmpQuote>,
    symbol_ids: &HashMap<String, i32>,
    ingested_at: DateTime<Utc>,
) -> Vec<NewMarketRecordModel> {
    quotes
        .into_iter()
        .filter_map(|quote| {
            let Some(&commodity_id) = symbol_ids.get(&quote.symbol) else {
                warn!(symbol = %quote.symbol, "Quote for untracked symbol, dropping");
                return None;
            };
            let Some(price) = quote.price.filter(|p| *p >= Decimal::ZERO) else {
                warn!(symbol = %quote.symbol, price = ?quote.price, "Quote without a valid price, dropping");
                return None;
            };
            let Some(recorded_at) = quote.timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0)) else {
                warn!(symbol = %quote.symbol, timestamp = ?quote.timestamp, "Quote without a valid timestamp, dropping");
                return None;
            };

            Some(NewMarketRecordModel {
                commodity_id,
                recorded_at,
                price,
                volume: quote.volume,
                day_high: quote.day_high,
                day_low: quote.day_low,
                change: quote.change,
                change_percentage: quote.change_percentage,
                open_price: quote.open,
                previous_close: quote.previous_close,
                price_avg_50: quote.price_avg_50,
                price_avg_200: quote.price_avg_200,
                year_high: quote.year_high,
                year_low: quote.year_low,
                ingested_at,
            })
        })
        .collect()
}

/// Map end-of-day history onto `market_records` rows, keeping dates on or after `since`
pub fn historical_to_records(
    rows: Vec<FmpHistoricalPrice>,
    symbol_ids: &HashMap<String, i32>,
    since: NaiveDate,
    ingested_at: DateTime<Utc>,
) -> Vec<NewMarketRecordModel> {
    rows.into_iter()
        .filter(|row| row.date >= since)
        .filter_map(|row| {
            let Some(&commodity_id) = symbol_ids.get(&row.symbol) else {
                warn!(symbol = %row.symbol, "Historical row for untracked symbol, dropping");
                return None;
            };
            let Some(price) = row.close.filter(|p| *p >= Decimal::ZERO) else {
                warn!(symbol = %row.symbol, date = %row.date, "Historical row without a close price, dropping");
                return None;
            };
            let recorded_at = row.date.and_hms_opt(0, 0, 0)?.and_utc();

            Some(NewMarketRecordModel {
                commodity_id,
                recorded_at,
                price,
                volume: row.volume,
                day_high: row.high,
                day_low: row.low,
                change: row.change,
                change_percentage: row.change_percent,
                open_price: row.open,
                previous_close: None,
                price_avg_50: None,
                price_avg_200: None,
                year_high: None,
                year_low: None,
                ingested_at,
            })
        })
        .collect()
}

/// Latest price per commodity from freshly ingested records
pub fn snapshot_from_records(records: &[NewMarketRecordModel]) -> Result<PriceSnapshot, AppError> {
    let mut latest: HashMap<i32, &NewMarketRecordModel> = HashMap::new();
    for record in records {
        match latest.get(&record.commodity_id) {
            Some(existing) if existing.recorded_at > record.recorded_at => {}
            _ => {
                latest.insert(record.commodity_id, record);
            }
        }
    }

    PriceSnapshot::from_entries(latest.into_values().map(|record| PriceEntry {
        commodity_id: record.commodity_id,
        price: record.price,
    }))
}
