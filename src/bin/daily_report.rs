use pivot_point::config;
use pivot_point::db::db_manager::DbManager;
use pivot_point::logging;
use pivot_point::mail::HttpMailer;
use pivot_point::report::{self, ReportComposer, ReportSender};

use chrono::{Days, Utc};
use dotenvy::dotenv;
use eyre::eyre;
use std::sync::Arc;
use tracing::{info, warn};

/// Mails each user the previous UTC day's movement of the commodities they track
#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = config::Config::load()?;
    info!("Configuration loaded and logging initialized");

    let report_date = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| eyre!("No previous day to report on"))?;
    let (start, end) = report::day_window(report_date).ok_or_else(|| eyre!("Invalid report date {}", report_date))?;

    let db = DbManager::init(&cfg).await?;
    let records = db.get_market_records_in_range(start, end).await?;
    if records.is_empty() {
        warn!(%report_date, "No market data for report date, nothing to send");
        db.pool.close().await;
        return Ok(());
    }
    let subscriptions = db.get_all_user_commodity_details().await?;
    info!(%report_date, records = records.len(), subscriptions = subscriptions.len(), "Report data extracted");

    let reports = report::build_user_reports(&subscriptions, &records, report_date);

    let mailer = Arc::new(HttpMailer::new(&cfg)?);
    let sender = ReportSender::new(ReportComposer::new(cfg.dashboard_url.clone())?, mailer, cfg.mail_timeout);
    let delivery = sender.send_all(&reports).await?;
    info!(
        sent = delivery.sent,
        skipped = delivery.skipped,
        failed = delivery.failed,
        "Daily reports delivered"
    );

    db.pool.close().await;
    Ok(())
}
