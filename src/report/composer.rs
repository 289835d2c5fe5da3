use chrono::{Datelike, Utc};
use handlebars::Handlebars;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::summary::{CommoditySummary, UserReport};
use crate::alerts::composer::format_money;
use crate::errors::AppError;
use crate::mail::EmailMessage;

const REPORT_TEMPLATE: &str = "daily_report";

const GAIN_COLOR: &str = "#22c55e";
const LOSS_COLOR: &str = "#ef4444";
const FLAT_COLOR: &str = "#64748b";

/// Renders the per-user daily report email
pub struct ReportComposer {
    registry: Handlebars<'static>,
    dashboard_url: String,
}

impl ReportComposer {
    pub fn new(dashboard_url: impl Into<String>) -> Result<Self, AppError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string(REPORT_TEMPLATE, include_str!("../../templates/daily_report.hbs"))?;

        Ok(Self {
            registry,
            dashboard_url: dashboard_url.into(),
        })
    }

    pub fn compose(&self, report: &UserReport) -> Result<EmailMessage, AppError> {
        let report_date = report.report_date.format("%B %-d, %Y").to_string();
        let commodities: Vec<Value> = report.commodities.iter().map(commodity_row).collect();

        let data = json!({
            "display_name": display_name(&report.user_name),
            "report_date": report_date,
            "commodity_count": report.commodities.len(),
            "commodities": commodities,
            "dashboard_url": self.dashboard_url,
            "year": Utc::now().year(),
        });

        let html = self.registry.render(REPORT_TEMPLATE, &data)?;

        Ok(EmailMessage {
            to: report.email.clone(),
            subject: format!("Your daily commodity report for {}", report_date),
            html,
        })
    }
}

fn commodity_row(summary: &CommoditySummary) -> Value {
    let change_text = match summary.change_pct {
        Some(pct) => format!("{} ({}%)", signed_money(summary.change), signed_money(pct)),
        None => signed_money(summary.change),
    };
    let (pl_text, pl_color) = match (summary.profit_loss, summary.profit_loss_pct) {
        (Some(pl), Some(pct)) => (format!("{} ({}%)", signed_money(pl), signed_money(pct)), color_for(pl)),
        _ => ("n/a".to_string(), FLAT_COLOR),
    };

    json!({
        "commodity_name": summary.commodity_name,
        "symbol": summary.symbol,
        "open_price": format_money(summary.open_price),
        "close_price": format_money(summary.close_price),
        "change_text": change_text,
        "change_color": color_for(summary.change),
        "pl_text": pl_text,
        "pl_color": pl_color,
    })
}

fn color_for(value: Decimal) -> &'static str {
    if value > Decimal::ZERO {
        GAIN_COLOR
    } else if value < Decimal::ZERO {
        LOSS_COLOR
    } else {
        FLAT_COLOR
    }
}

fn signed_money(value: Decimal) -> String {
    let formatted = format_money(value);
    if value > Decimal::ZERO { format!("+{}", formatted) } else { formatted }
}

/// `alice_jones` -> `Alice Jones`
pub fn display_name(user_name: &str) -> String {
    user_name
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn summary(change: Decimal, pl: Option<Decimal>) -> CommoditySummary {
        CommoditySummary {
            symbol: "GCUSD".to_string(),
            commodity_name: "Gold Futures".to_string(),
            open_price: dec!(100),
            close_price: dec!(100) + change,
            change,
            change_pct: Some(change),
            buy_price: pl.map(|_| dec!(90)),
            sell_price: None,
            profit_loss: pl,
            profit_loss_pct: pl.map(|v| v / dec!(90) * dec!(100)),
            record_count: 2,
        }
    }

    fn report(commodities: Vec<CommoditySummary>) -> UserReport {
        UserReport {
            user_id: 1,
            user_name: "alice_jones".to_string(),
            email: "alice@example.com".to_string(),
            report_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            commodities,
        }
    }

    #[test]
    fn report_lists_each_commodity_with_signed_change() {
        let composer = ReportComposer::new("https://dashboard.example.com").unwrap();

        let message = composer.compose(&report(vec![summary(dec!(10), Some(dec!(20)))])).unwrap();

        assert_eq!(message.to, "alice@example.com");
        assert_eq!(message.subject, "Your daily commodity report for January 5, 2026");
        assert!(message.html.contains("Hi Alice Jones,"));
        assert!(message.html.contains("Gold Futures"));
        assert!(message.html.contains("$100.00"));
        assert!(message.html.contains("$110.00"));
        assert!(message.html.contains("+10.00 (+10.00%)"));
        assert!(message.html.contains("+20.00 (+22.22%)"));
        assert!(message.html.contains(GAIN_COLOR));
    }

    #[test]
    fn missing_buy_price_renders_not_applicable() {
        let composer = ReportComposer::new("#").unwrap();

        let message = composer.compose(&report(vec![summary(dec!(-5), None)])).unwrap();

        assert!(message.html.contains("-5.00 (-5.00%)"));
        assert!(message.html.contains("n/a"));
        assert!(message.html.contains(LOSS_COLOR));
    }

    #[test]
    fn display_name_capitalises_each_part() {
        assert_eq!(display_name("alice_jones"), "Alice Jones");
        assert_eq!(display_name("BOB"), "Bob");
        assert_eq!(display_name("carol__ann_"), "Carol Ann");
    }
}
