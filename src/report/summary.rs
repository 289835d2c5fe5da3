use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::db::models::market_records::MarketRecordModel;
use crate::db::models::user_commodities::UserCommodityDetailsModel;

/// One tracked commodity's day, from the user's point of view
#[derive(Debug, Clone, PartialEq)]
pub struct CommoditySummary {
    pub symbol: String,
    pub commodity_name: String,
    pub open_price: Decimal,  // First recorded price of the day
    pub close_price: Decimal, // Last recorded price of the day
    pub change: Decimal,
    pub change_pct: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    pub profit_loss: Option<Decimal>,
    pub profit_loss_pct: Option<Decimal>,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserReport {
    pub user_id: i32,
    pub user_name: String,
    pub email: String,
    pub report_date: NaiveDate,
    pub commodities: Vec<CommoditySummary>,
}

/// Profit or loss of the close against the user's buy price.
/// Undefined without a buy price, with a zero one, or when the result
/// does not fit in a `Decimal`.
pub fn profit_loss(close_price: Decimal, buy_price: Option<Decimal>) -> Option<(Decimal, Decimal)> {
    let buy_price = buy_price.filter(|p| !p.is_zero())?;
    let pl = close_price.checked_sub(buy_price)?;
    Some((pl, percent_of(pl, buy_price)?))
}

/// `part / whole * 100`, `None` on a zero `whole` or overflow
fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)?.checked_mul(Decimal::ONE_HUNDRED)
}

/// Build one report per user that has data for at least one tracked commodity.
/// `records` must be ordered by `recorded_at` ascending.
pub fn build_user_reports(
    subscriptions: &[UserCommodityDetailsModel],
    records: &[MarketRecordModel],
    report_date: NaiveDate,
) -> Vec<UserReport> {
    let mut by_commodity: HashMap<i32, Vec<&MarketRecordModel>> = HashMap::new();
    for record in records {
        by_commodity.entry(record.commodity_id).or_default().push(record);
    }

    let mut reports: Vec<UserReport> = Vec::new();
    for subscription in subscriptions {
        let Some(day) = by_commodity.get(&subscription.commodity_id) else {
            continue;
        };
        let (Some(first), Some(last)) = (day.first(), day.last()) else {
            continue;
        };

        let open_price = first.price;
        let close_price = last.price;
        let Some(change) = close_price.checked_sub(open_price) else {
            warn!(commodity_id = subscription.commodity_id, "Daily change out of range, skipping commodity");
            continue;
        };
        let change_pct = percent_of(change, open_price);
        let pl = profit_loss(close_price, subscription.buy_price);

        let summary = CommoditySummary {
            symbol: subscription.symbol.clone(),
            commodity_name: subscription.commodity_name.clone(),
            open_price,
            close_price,
            change,
            change_pct,
            buy_price: subscription.buy_price,
            sell_price: subscription.sell_price,
            profit_loss: pl.map(|(v, _)| v),
            profit_loss_pct: pl.map(|(_, p)| p),
            record_count: day.len(),
        };

        match reports.iter_mut().find(|r| r.user_id == subscription.user_id) {
            Some(report) => report.commodities.push(summary),
            None => reports.push(UserReport {
                user_id: subscription.user_id,
                user_name: subscription.user_name.clone(),
                email: subscription.email.clone(),
                report_date,
                commodities: vec![summary],
            }),
        }
    }

    debug!(users = reports.len(), "Built daily user reports");
    reports
}
