use pivot_point::alerts::{AlertService, AlertSettings};
use pivot_point::config::{self, Config};
use pivot_point::db::db_manager::DbManager;
use pivot_point::logging;
use pivot_point::mail::HttpMailer;
use pivot_point::market_data::{transform, FmpClient};

use chrono::Utc;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment variables from .env file, if present
    dotenv().ok();

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = config::Config::load()?;
    info!(interval_secs = cfg.collection_interval.as_secs(), "Configuration loaded and logging initialized");

    // Initialize database manager
    let db = Arc::new(DbManager::init(&cfg).await?);
    info!("Database manager initialized");

    let fmp = FmpClient::new(&cfg)?;
    let mailer = Arc::new(HttpMailer::new(&cfg)?);
    let alerts = AlertService::new(db.clone(), mailer, AlertSettings::from(&cfg))?;
    info!("Market data client and alert service initialized");

    let mut ticker = interval(cfg.collection_interval);
    info!("Starting main data collection loop");

    loop {
        ticker.tick().await;
        info!("Data collection cycle started");

        if let Err(e) = run_cycle(&cfg, &db, &fmp, &alerts).await {
            error!(?e, "Data collection cycle failed");
        }
    }
}

/// Extract, load, then alert on what was just fetched
#[instrument(name = "collection_cycle", skip_all, fields(on_close = true))]
async fn run_cycle(cfg: &Config, db: &DbManager, fmp: &FmpClient, alerts: &AlertService) -> eyre::Result<()> {
    let commodities = db.get_commodities().await?;
    if commodities.is_empty() {
        warn!("No commodities configured, nothing to collect");
        return Ok(());
    }
    let symbol_ids = db.get_symbol_id_map().await?;

    let mut quotes = Vec::new();
    for commodity in &commodities {
        match fmp.get_quote(&commodity.symbol).await {
            Ok(mut batch) => quotes.append(&mut batch),
            Err(e) => error!(symbol = %commodity.symbol, ?e, "Failed to fetch quote"),
        }
    }
    debug!(quotes = quotes.len(), commodities = commodities.len(), "Quotes fetched");

    let records = transform::quotes_to_records(quotes, &symbol_ids, Utc::now());
    if records.is_empty() {
        warn!("No usable quotes this cycle");
        return Ok(());
    }

    let inserted = db.insert_market_records(&records).await?;
    info!(inserted, "Market records stored");

    let snapshot = transform::snapshot_from_records(&records)?;
    let response = alerts.run(&snapshot).await?.into_response();
    info!(
        status_code = response.status_code,
        message = response.message.as_deref().unwrap_or_default(),
        interval_secs = cfg.collection_interval.as_secs(),
        "Data collection cycle completed"
    );
    Ok(())
}
