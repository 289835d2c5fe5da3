pub mod types;
pub mod matcher;
pub mod composer;
pub mod dispatcher;
pub mod store;
pub mod handler;

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::errors::AppError;

pub use handler::{AlertRunOutcome, AlertService, HandlerResponse};
pub use types::{AlertEvent, AlertKind, CustomerInfo, PriceEntry, PriceSnapshot, Subscription, SubscriptionKey};

/// Tunables for one alert run
#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub cooldown: chrono::Duration,
    pub claim_ttl: chrono::Duration,
    pub mail_timeout: Duration,
    pub db_timeout: Duration,
    pub dashboard_url: String,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            cooldown: chrono::Duration::hours(2),
            claim_ttl: chrono::Duration::minutes(15),
            mail_timeout: Duration::from_secs(10),
            db_timeout: Duration::from_secs(10),
            dashboard_url: "#".to_string(),
        }
    }
}

impl From<&Config> for AlertSettings {
    fn from(config: &Config) -> Self {
        Self {
            cooldown: config.alert_cooldown,
            claim_ttl: config.alert_claim_ttl,
            mail_timeout: config.mail_timeout,
            db_timeout: config.db_timeout,
            dashboard_url: config.dashboard_url.clone(),
        }
    }
}

/// Run `fut` with an upper bound on its duration
pub(crate) async fn bounded<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout { operation, seconds: limit.as_secs() }),
    }
}
