use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use governor::{Quota, DefaultDirectRateLimiter};
use nonzero_ext::*;
use serde::de::DeserializeOwned;
use std::time::Duration;
use std::sync::Arc;
use tracing::{debug, warn, instrument};
use url::Url;

use super::fmp_types::{FmpHistoricalPrice, FmpQuote};
use crate::config::Config;
use crate::errors::AppError;

struct FmpRateLimiter {
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl reqwest_ratelimit::RateLimiter for FmpRateLimiter {
    async fn acquire_permit(&self) {
        self.rate_limiter.until_ready().await;
    }
}

/// Financial Modeling Prep market data client
#[derive(Debug, Clone)]
pub struct FmpClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl FmpClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = config.require_fmp_api_key()?;

        let reqwest_client = reqwest_middleware::reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_millis(2000))
            .build_with_max_retries(3);

        let rate_limiter = FmpRateLimiter {
            rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(nonzero!(5u32)))),
        };

        let http_client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(reqwest_ratelimit::all(rate_limiter))
            .build();

        Ok(Self {
            http_client,
            base_url: config.fmp_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Latest quote for one symbol. Empty when the API has nothing for it.
    #[instrument(skip(self))]
    pub async fn get_quote(&self, symbol: &str) -> Result<Vec<FmpQuote>, AppError> {
        let url = self.endpoint("stable/quote", symbol)?;
        self.get_list(url, symbol).await
    }

    /// Daily end-of-day history for one symbol, newest first as returned by the API
    #[instrument(skip(self))]
    pub async fn get_historical_eod(&self, symbol: &str) -> Result<Vec<FmpHistoricalPrice>, AppError> {
        let url = self.endpoint("stable/historical-price-eod/full", symbol)?;
        self.get_list(url, symbol).await
    }

    fn endpoint(&self, path: &str, symbol: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| AppError::Config(format!("Invalid FMP_BASE_URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("apikey", &self.api_key);
        Ok(url)
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url, symbol: &str) -> Result<Vec<T>, AppError> {
        let response = self.http_client.get(url).send().await?;

        // Bad symbol, auth or server errors yield no data for this symbol
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(symbol, %status, body = %body, "Market data request failed");
            return Ok(Vec::new());
        }

        let items: Vec<T> = response.json().await?;
        debug!(symbol, count = items.len(), "Received market data");
        Ok(items)
    }
}
