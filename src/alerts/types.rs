use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::AppError;

/// Identifies one row of `user_commodities`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub user_id: i32,
    pub commodity_id: i32,
}

/// One user's interest in one commodity, with optional alert thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub user_id: i32,
    pub commodity_id: i32,
    pub buy_price: Option<Decimal>,  // Alert when the market falls to or below this
    pub sell_price: Option<Decimal>, // Alert when the market rises to or above this
    pub last_alerted_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey {
            user_id: self.user_id,
            commodity_id: self.commodity_id,
        }
    }

    /// Tracking-only subscriptions have no threshold and never alert
    pub fn has_threshold(&self) -> bool {
        self.buy_price.is_some() || self.sell_price.is_some()
    }
}

/// Latest observed price of one commodity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub commodity_id: i32,
    pub price: Decimal,
}

/// Latest prices keyed by commodity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    entries: HashMap<i32, PriceEntry>,
}

impl PriceSnapshot {
    /// Build a snapshot, rejecting negative prices.
    /// A later entry for the same commodity replaces an earlier one.
    pub fn from_entries<I>(entries: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = PriceEntry>,
    {
        let mut map = HashMap::new();
        for entry in entries {
            if entry.price < Decimal::ZERO {
                return Err(AppError::InvalidPayload(format!(
                    "negative price {} for commodity {}",
                    entry.price, entry.commodity_id
                )));
            }
            map.insert(entry.commodity_id, entry);
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, commodity_id: i32) -> Option<&PriceEntry> {
        self.entries.get(&commodity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Buy,
    Sell,
}

impl AlertKind {
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::Buy => "BUY",
            AlertKind::Sell => "SELL",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Buy => write!(f, "buy"),
            AlertKind::Sell => write!(f, "sell"),
        }
    }
}

/// A threshold crossed by the latest price. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    Buy { subscription: Subscription, current_price: Decimal },
    Sell { subscription: Subscription, current_price: Decimal },
}

impl AlertEvent {
    pub fn kind(&self) -> AlertKind {
        match self {
            AlertEvent::Buy { .. } => AlertKind::Buy,
            AlertEvent::Sell { .. } => AlertKind::Sell,
        }
    }

    pub fn subscription(&self) -> &Subscription {
        match self {
            AlertEvent::Buy { subscription, .. } | AlertEvent::Sell { subscription, .. } => subscription,
        }
    }

    pub fn current_price(&self) -> Decimal {
        match self {
            AlertEvent::Buy { current_price, .. } | AlertEvent::Sell { current_price, .. } => *current_price,
        }
    }

    /// The threshold that fired. Variants are only built when it is set.
    pub fn target_price(&self) -> Decimal {
        match self {
            AlertEvent::Buy { subscription, .. } => subscription.buy_price.unwrap_or_default(),
            AlertEvent::Sell { subscription, .. } => subscription.sell_price.unwrap_or_default(),
        }
    }
}

/// Display fields joined from `users` and `commodities` for one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub email: String,
    pub user_name: String,
    pub symbol: String,
    pub commodity_name: String,
}

/// An alert ready to be composed and sent
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerInfo {
    pub event: AlertEvent,
    pub email: String,
    pub user_name: String,
    pub symbol: String,
    pub commodity_name: String,
}

impl CustomerInfo {
    pub fn new(event: AlertEvent, details: CustomerDetails) -> Self {
        Self {
            event,
            email: details.email,
            user_name: details.user_name,
            symbol: details.symbol,
            commodity_name: details.commodity_name,
        }
    }

    pub fn key(&self) -> SubscriptionKey {
        self.event.subscription().key()
    }
}
