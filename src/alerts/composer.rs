use chrono::{Datelike, Utc};
use handlebars::Handlebars;
use rust_decimal::Decimal;
use serde_json::json;

use super::types::{AlertKind, CustomerInfo};
use crate::errors::AppError;
use crate::mail::EmailMessage;

const ALERT_TEMPLATE: &str = "alert_email";

/// Renders price alert emails
pub struct AlertComposer {
    registry: Handlebars<'static>,
    dashboard_url: String,
}

impl AlertComposer {
    pub fn new(dashboard_url: impl Into<String>) -> Result<Self, AppError> {
        let mut registry = Handlebars::new();
        // Every placeholder must be supplied
        registry.set_strict_mode(true);
        registry.register_template_string(ALERT_TEMPLATE, include_str!("../../templates/alert_email.hbs"))?;

        Ok(Self {
            registry,
            dashboard_url: dashboard_url.into(),
        })
    }

    pub fn compose(&self, info: &CustomerInfo) -> Result<EmailMessage, AppError> {
        let kind = info.event.kind();
        let (badge_color, accent_color, comparison) = match kind {
            AlertKind::Buy => ("#22c55e", "#03c1ff", "at or below"),
            AlertKind::Sell => ("#ef4444", "#e6530c", "at or above"),
        };
        let current_price = format_money(info.event.current_price());
        let target_price = format_money(info.event.target_price());

        let data = json!({
            "label": kind.label(),
            "kind": kind.to_string(),
            "badge_color": badge_color,
            "accent_color": accent_color,
            "comparison": comparison,
            "commodity_name": info.commodity_name,
            "symbol": info.symbol,
            "first_name": first_name(&info.user_name),
            "current_price": current_price,
            "target_price": target_price,
            "dashboard_url": self.dashboard_url,
            "year": Utc::now().year(),
        });

        let html = self.registry.render(ALERT_TEMPLATE, &data)?;

        Ok(EmailMessage {
            to: info.email.clone(),
            subject: format!(
                "{} alert: {} ({}) at ${}",
                kind.label(),
                info.commodity_name,
                info.symbol,
                current_price
            ),
            html,
        })
    }
}

/// Two decimal places, rounded half away from zero
pub fn format_money(value: Decimal) -> String {
    let mut rounded = value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// `john_doe` -> `John`
fn first_name(user_name: &str) -> String {
    let first = user_name.split('_').next().unwrap_or_default();
    let mut chars = first.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::types::{AlertEvent, Subscription};
    use rust_decimal_macros::dec;

    fn info(event: AlertEvent, user_name: &str) -> CustomerInfo {
        CustomerInfo {
            event,
            email: "john@example.com".to_string(),
            user_name: user_name.to_string(),
            symbol: "GCUSD".to_string(),
            commodity_name: "Gold Futures".to_string(),
        }
    }

    fn subscription(buy: Option<Decimal>, sell: Option<Decimal>) -> Subscription {
        Subscription {
            user_id: 7,
            commodity_id: 3,
            buy_price: buy,
            sell_price: sell,
            last_alerted_at: None,
        }
    }

    #[test]
    fn buy_email_carries_label_colour_and_prices() {
        let composer = AlertComposer::new("https://dashboard.example.com").unwrap();
        let event = AlertEvent::Buy {
            subscription: subscription(Some(dec!(2100)), None),
            current_price: dec!(2000.5),
        };

        let message = composer.compose(&info(event, "john_doe")).unwrap();

        assert_eq!(message.to, "john@example.com");
        assert!(message.html.contains("BUY ALERT TRIGGERED"));
        assert!(message.html.contains("#22c55e"));
        assert!(message.html.contains("#03c1ff"));
        assert!(message.html.contains("Gold Futures"));
        assert!(message.html.contains("GCUSD"));
        assert!(message.html.contains("Hi John,"));
        assert!(message.html.contains("$2000.50"));
        assert!(message.html.contains("$2100.00"));
        assert_eq!(message.subject, "BUY alert: Gold Futures (GCUSD) at $2000.50");
    }

    #[test]
    fn header_is_text_branding_without_inline_images() {
        let composer = AlertComposer::new("#").unwrap();
        let event = AlertEvent::Sell {
            subscription: subscription(None, Some(dec!(10))),
            current_price: dec!(12),
        };

        let message = composer.compose(&info(event, "john_doe")).unwrap();

        assert!(message.html.contains(">Pivot Point</span>"));
        assert!(!message.html.contains("cid:"));
        assert!(!message.html.contains("<img"));
    }

    #[test]
    fn sell_email_uses_sell_palette() {
        let composer = AlertComposer::new("#").unwrap();
        let event = AlertEvent::Sell {
            subscription: subscription(None, Some(dec!(24))),
            current_price: dec!(25.75),
        };

        let message = composer.compose(&info(event, "jane_smith")).unwrap();

        assert!(message.html.contains("SELL ALERT TRIGGERED"));
        assert!(message.html.contains("#ef4444"));
        assert!(message.html.contains("#e6530c"));
        assert!(message.html.contains("Hi Jane,"));
        assert!(message.html.contains("$25.75"));
        assert!(message.html.contains("$24.00"));
    }

    #[test]
    fn display_fields_are_escaped() {
        let composer = AlertComposer::new("#").unwrap();
        let event = AlertEvent::Buy {
            subscription: subscription(Some(dec!(1)), None),
            current_price: dec!(1),
        };
        let mut customer = info(event, "eve");
        customer.commodity_name = "<script>x</script>".to_string();

        let message = composer.compose(&customer).unwrap();

        assert!(!message.html.contains("<script>"));
        assert!(message.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn money_is_rounded_to_cents() {
        assert_eq!(format_money(dec!(6.038)), "6.04");
        assert_eq!(format_money(dec!(67.385)), "67.39");
        assert_eq!(format_money(dec!(25459.25)), "25459.25");
        assert_eq!(format_money(dec!(3)), "3.00");
    }

    #[test]
    fn first_name_is_capitalised() {
        assert_eq!(first_name("john_doe"), "John");
        assert_eq!(first_name("ALICE"), "Alice");
        assert_eq!(first_name(""), "");
    }
}
