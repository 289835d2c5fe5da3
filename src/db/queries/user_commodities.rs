use chrono::{DateTime, Utc};
use sqlx::{Error, PgPool};

use crate::db::models::user_commodities::{UserCommodityDetailsModel, UserCommodityModel};

/// Subscriptions with a threshold that were never alerted or alerted before the cutoff
pub async fn get_eligible_user_commodities(
    pool: &PgPool,
    alerted_before: DateTime<Utc>,
) -> Result<Vec<UserCommodityModel>, Error> {
    sqlx::query_as::<_, UserCommodityModel>(
        r#"
        SELECT user_commodity_id, user_id, commodity_id, buy_price, sell_price, alerted_at
        FROM user_commodities
        WHERE (buy_price IS NOT NULL OR sell_price IS NOT NULL)
          AND (alerted_at IS NULL OR alerted_at < $1)
        ORDER BY user_commodity_id
        "#,
    )
    .bind(alerted_before)
    .fetch_all(pool)
    .await
}

/// Display fields for one subscription, `None` if the user or commodity row is gone
pub async fn get_user_commodity_details(
    pool: &PgPool,
    user_id: i32,
    commodity_id: i32,
) -> Result<Option<UserCommodityDetailsModel>, Error> {
    sqlx::query_as::<_, UserCommodityDetailsModel>(
        r#"
        SELECT u.user_id, u.user_name, u.email,
               c.commodity_id, c.symbol, c.commodity_name, c.currency,
               uc.buy_price, uc.sell_price
        FROM user_commodities uc
        JOIN users u ON uc.user_id = u.user_id
        JOIN commodities c ON uc.commodity_id = c.commodity_id
        WHERE uc.user_id = $1 AND uc.commodity_id = $2
        "#,
    )
    .bind(user_id)
    .bind(commodity_id)
    .fetch_optional(pool)
    .await
}

/// Every subscription with user and commodity fields, for reporting
pub async fn get_all_user_commodity_details(pool: &PgPool) -> Result<Vec<UserCommodityDetailsModel>, Error> {
    sqlx::query_as::<_, UserCommodityDetailsModel>(
        r#"
        SELECT u.user_id, u.user_name, u.email,
               c.commodity_id, c.symbol, c.commodity_name, c.currency,
               uc.buy_price, uc.sell_price
        FROM user_commodities uc
        JOIN users u ON uc.user_id = u.user_id
        JOIN commodities c ON uc.commodity_id = c.commodity_id
        ORDER BY u.user_name, c.commodity_name
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Atomically mark a subscription as being alerted.
///
/// Succeeds only while the subscription is still outside its cooldown and no
/// live claim exists, so two overlapping runs cannot both win.
pub async fn claim_user_commodity(
    pool: &PgPool,
    user_id: i32,
    commodity_id: i32,
    alerted_before: DateTime<Utc>,
    claim_expired_before: DateTime<Utc>,
) -> Result<bool, Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_commodities
        SET alert_claimed_at = NOW()
        WHERE user_id = $1 AND commodity_id = $2
          AND (alerted_at IS NULL OR alerted_at < $3)
          AND (alert_claimed_at IS NULL OR alert_claimed_at < $4)
        "#,
    )
    .bind(user_id)
    .bind(commodity_id)
    .bind(alerted_before)
    .bind(claim_expired_before)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Drop a claim without recording an alert
pub async fn release_claim(pool: &PgPool, user_id: i32, commodity_id: i32) -> Result<(), Error> {
    sqlx::query(
        r#"
        UPDATE user_commodities
        SET alert_claimed_at = NULL
        WHERE user_id = $1 AND commodity_id = $2
        "#,
    )
    .bind(user_id)
    .bind(commodity_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a delivered alert and clear the claim
pub async fn set_alerted_at(
    pool: &PgPool,
    user_id: i32,
    commodity_id: i32,
    alerted_at: DateTime<Utc>,
) -> Result<(), Error> {
    sqlx::query(
        r#"
        UPDATE user_commodities
        SET alerted_at = $3, alert_claimed_at = NULL
        WHERE user_id = $1 AND commodity_id = $2
        "#,
    )
    .bind(user_id)
    .bind(commodity_id)
    .bind(alerted_at)
    .execute(pool)
    .await?;

    Ok(())
}
