use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::AppError;

const DEFAULT_FMP_BASE_URL: &str = "https://financialmodelingprep.com";

/// Runtime configuration shared by all binaries.
///
/// Only `DATABASE_URL` is required for every binary. Credentials needed by a
/// single binary are optional here and checked with the `require_*` accessors,
/// so a missing key fails fast before that binary does any work.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_timeout: Duration,

    // Mail transport
    pub sender_email: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_timeout: Duration,
    pub verified_recipients: Vec<String>,

    // Alerting
    pub alert_cooldown: chrono::Duration, // Minimum gap between two alerts for one subscription
    pub alert_claim_ttl: chrono::Duration, // How long an in-flight claim blocks other runs
    pub dashboard_url: String,

    // Market data
    pub fmp_api_key: Option<String>,
    pub fmp_base_url: String,
    pub collection_interval: Duration,
    pub history_days: i64,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;

        let verified_recipients = env::var("VERIFIED_RECIPIENTS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            database_url,
            db_timeout: Duration::from_secs(parsed_or("DB_TIMEOUT_SECS", 10)?),
            sender_email: optional("SENDER_EMAIL"),
            mail_api_url: optional("MAIL_API_URL"),
            mail_api_key: optional("MAIL_API_KEY"),
            mail_timeout: Duration::from_secs(parsed_or("MAIL_TIMEOUT_SECS", 10)?),
            verified_recipients,
            alert_cooldown: chrono::Duration::minutes(parsed_or("ALERT_COOLDOWN_MINUTES", 120)?),
            alert_claim_ttl: chrono::Duration::minutes(parsed_or("ALERT_CLAIM_TTL_MINUTES", 15)?),
            dashboard_url: optional("DASHBOARD_URL").unwrap_or_else(|| "#".to_string()),
            fmp_api_key: optional("FMP_API_KEY"),
            fmp_base_url: optional("FMP_BASE_URL").unwrap_or_else(|| DEFAULT_FMP_BASE_URL.to_string()),
            collection_interval: Duration::from_secs(parsed_or("COLLECTION_INTERVAL_SECS", 300)?),
            history_days: parsed_or("HISTORY_DAYS", 30)?,
        })
    }

    pub fn require_sender_email(&self) -> Result<&str, AppError> {
        present(&self.sender_email, "SENDER_EMAIL")
    }

    pub fn require_mail_api(&self) -> Result<(&str, &str), AppError> {
        Ok((
            present(&self.mail_api_url, "MAIL_API_URL")?,
            present(&self.mail_api_key, "MAIL_API_KEY")?,
        ))
    }

    pub fn require_fmp_api_key(&self) -> Result<&str, AppError> {
        present(&self.fmp_api_key, "FMP_API_KEY")
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, AppError> {
    optional(key).ok_or_else(|| AppError::Config(format!("Missing {}", key)))
}

fn present<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .ok_or_else(|| AppError::Config(format!("Missing {}", key)))
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, AppError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("Invalid {} value: {}", key, raw))),
        None => Ok(default),
    }
}
