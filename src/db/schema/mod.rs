use sqlx::{
    Executor,
    postgres::PgPool,
};

pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("users.sql")).await?;
    pool.execute(include_str!("commodities.sql")).await?;
    pool.execute(include_str!("user_commodities.sql")).await?;
    pool.execute(include_str!("market_records.sql")).await?;

    // Daily report and dashboard queries scan one commodity over a time range
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_market_records_commodity_recorded
        ON market_records(commodity_id, recorded_at);
        "#
    )
    .execute(pool)
    .await?;

    // Partial index for the alert eligibility scan
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_user_commodities_thresholds
        ON user_commodities(alerted_at)
        WHERE buy_price IS NOT NULL OR sell_price IS NOT NULL;
        "#
    )
    .execute(pool)
    .await?;

    Ok(())
}
