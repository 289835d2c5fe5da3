use super::types::{AlertEvent, PriceEntry, PriceSnapshot, Subscription};

/// Decide whether one subscription fires against its latest price.
///
/// No price this cycle means no alert. Buy is checked before sell, so a price
/// satisfying both thresholds produces only a buy alert. Both boundaries are
/// inclusive.
pub fn evaluate(subscription: &Subscription, price_entry: Option<&PriceEntry>) -> Option<AlertEvent> {
    let price = price_entry?.price;

    if let Some(buy_price) = subscription.buy_price {
        if price <= buy_price {
            return Some(AlertEvent::Buy {
                subscription: subscription.clone(),
                current_price: price,
            });
        }
    }

    if let Some(sell_price) = subscription.sell_price {
        if price >= sell_price {
            return Some(AlertEvent::Sell {
                subscription: subscription.clone(),
                current_price: price,
            });
        }
    }

    None
}

/// Evaluate every subscription against the snapshot, keeping input order
pub fn evaluate_batch(subscriptions: &[Subscription], snapshot: &PriceSnapshot) -> Vec<AlertEvent> {
    subscriptions
        .iter()
        .filter_map(|subscription| evaluate(subscription, snapshot.get(subscription.commodity_id)))
        .collect()
}
