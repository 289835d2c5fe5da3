use sqlx::{Error, PgPool};
use std::collections::HashMap;

use crate::db::models::commodities::CommodityModel;

/// Fetch all tracked commodities
pub async fn get_all_commodities(pool: &PgPool) -> Result<Vec<CommodityModel>, Error> {
    sqlx::query_as::<_, CommodityModel>(
        "SELECT commodity_id, symbol, commodity_name, currency FROM commodities ORDER BY commodity_name"
    )
    .fetch_all(pool)
    .await
}

/// Load a map from commodity symbol to commodity ID
pub async fn get_symbol_id_map(pool: &PgPool) -> Result<HashMap<String, i32>, Error> {
    let rows: Vec<(String, i32)> = sqlx::query_as(
        "SELECT symbol, commodity_id FROM commodities"
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
