use rust_decimal::Decimal;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::alerts::types::{CustomerDetails, Subscription};

#[derive(Debug, Clone, FromRow)]
pub struct UserCommodityModel {
    pub user_commodity_id: i32,
    pub user_id: i32,
    pub commodity_id: i32,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub alerted_at: Option<DateTime<Utc>>,
}

impl From<UserCommodityModel> for Subscription {
    fn from(model: UserCommodityModel) -> Self {
        Self {
            user_id: model.user_id,
            commodity_id: model.commodity_id,
            buy_price: model.buy_price,
            sell_price: model.sell_price,
            last_alerted_at: model.alerted_at,
        }
    }
}

/// `user_commodities` joined with `users` and `commodities`
#[derive(Debug, Clone, FromRow)]
pub struct UserCommodityDetailsModel {
    pub user_id: i32,
    pub user_name: String,
    pub email: String,
    pub commodity_id: i32,
    pub symbol: String,
    pub commodity_name: String,
    pub currency: String,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
}

impl From<UserCommodityDetailsModel> for CustomerDetails {
    fn from(model: UserCommodityDetailsModel) -> Self {
        Self {
            email: model.email,
            user_name: model.user_name,
            symbol: model.symbol,
            commodity_name: model.commodity_name,
        }
    }
}
