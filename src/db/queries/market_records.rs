use chrono::{DateTime, Utc};
use sqlx::{Error, Executor, PgPool, Postgres};

use crate::db::models::market_records::{MarketRecordModel, NewMarketRecordModel};

/// Insert a single market record. Accepts a pool or an open transaction.
pub async fn insert_market_record<'e, E>(executor: E, record: &NewMarketRecordModel) -> Result<(), Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO market_records (
            commodity_id, recorded_at, price, volume, day_high, day_low,
            change, change_percentage, open_price, previous_close,
            price_avg_50, price_avg_200, year_high, year_low, ingested_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(record.commodity_id)
    .bind(record.recorded_at)
    .bind(record.price)
    .bind(record.volume)
    .bind(record.day_high)
    .bind(record.day_low)
    .bind(record.change)
    .bind(record.change_percentage)
    .bind(record.open_price)
    .bind(record.previous_close)
    .bind(record.price_avg_50)
    .bind(record.price_avg_200)
    .bind(record.year_high)
    .bind(record.year_low)
    .bind(record.ingested_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Fetch all market records in `[start, end)` with their commodity, oldest first
pub async fn get_market_records_in_range(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<MarketRecordModel>, Error> {
    sqlx::query_as::<_, MarketRecordModel>(
        r#"
        SELECT mr.market_record_id, mr.commodity_id, c.symbol, c.commodity_name,
               mr.recorded_at, mr.price, mr.volume, mr.day_high, mr.day_low, mr.change_percentage
        FROM market_records mr
        JOIN commodities c ON mr.commodity_id = c.commodity_id
        WHERE mr.recorded_at >= $1 AND mr.recorded_at < $2
        ORDER BY mr.recorded_at ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}
