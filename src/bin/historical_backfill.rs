use pivot_point::config;
use pivot_point::db::db_manager::DbManager;
use pivot_point::logging;
use pivot_point::market_data::{transform, FmpClient};

use chrono::{Days, Utc};
use dotenvy::dotenv;
use eyre::eyre;
use tracing::{error, info, warn};

/// Loads the recent end-of-day price history of every tracked commodity
#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = config::Config::load()?;
    info!(history_days = cfg.history_days, "Configuration loaded and logging initialized");

    let days = u64::try_from(cfg.history_days).map_err(|_| eyre!("HISTORY_DAYS must not be negative"))?;
    let since = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(days))
        .ok_or_else(|| eyre!("HISTORY_DAYS reaches before the calendar start"))?;

    let db = DbManager::init(&cfg).await?;
    let fmp = FmpClient::new(&cfg)?;
    let symbol_ids = db.get_symbol_id_map().await?;

    let mut total = 0usize;
    for commodity in db.get_commodities().await? {
        let rows = match fmp.get_historical_eod(&commodity.symbol).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(symbol = %commodity.symbol, ?e, "Failed to fetch price history");
                continue;
            }
        };

        let records = transform::historical_to_records(rows, &symbol_ids, since, Utc::now());
        if records.is_empty() {
            warn!(symbol = %commodity.symbol, "No history in window");
            continue;
        }

        match db.insert_market_records(&records).await {
            Ok(inserted) => {
                info!(symbol = %commodity.symbol, inserted, "History stored");
                total += inserted;
            }
            Err(e) => error!(symbol = %commodity.symbol, ?e, "Failed to store price history"),
        }
    }

    info!(total, %since, "Historical backfill completed");
    db.pool.close().await;
    Ok(())
}
