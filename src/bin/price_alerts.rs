use pivot_point::alerts::{AlertService, AlertSettings};
use pivot_point::config;
use pivot_point::db::db_manager::DbManager;
use pivot_point::logging;
use pivot_point::mail::HttpMailer;

use dotenvy::dotenv;
use eyre::WrapErr;
use std::io::Read;
use std::sync::Arc;
use tracing::info;

/// Runs the alert pipeline once for a price event read from the file
/// given as the first argument, or from stdin when none is given.
#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = config::Config::load()?;
    info!("Configuration loaded and logging initialized");

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read event file {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).wrap_err("Failed to read event from stdin")?;
            buf
        }
    };
    let event: serde_json::Value = serde_json::from_str(&raw).wrap_err("Event is not valid JSON")?;

    let db = Arc::new(DbManager::init(&cfg).await?);
    let mailer = Arc::new(HttpMailer::new(&cfg)?);
    let service = AlertService::new(db.clone(), mailer, AlertSettings::from(&cfg))?;

    let response = service.handle(event).await;
    info!(status_code = response.status_code, "Alert handler finished");
    println!("{}", serde_json::to_string_pretty(&response)?);

    db.pool.close().await;
    Ok(())
}
