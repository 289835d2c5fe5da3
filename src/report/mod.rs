pub mod summary;
pub mod composer;

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::alerts::bounded;
use crate::errors::AppError;
use crate::mail::MailTransport;

pub use composer::ReportComposer;
pub use summary::{build_user_reports, CommoditySummary, UserReport};

/// `[start, end)` covering one UTC calendar day
pub fn day_window(day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = day.and_hms_opt(0, 0, 0)?.and_utc();
    let end = day.succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc();
    Some((start, end))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportDelivery {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Mails one rendered report per user
pub struct ReportSender {
    composer: ReportComposer,
    transport: Arc<dyn MailTransport>,
    mail_timeout: Duration,
}

impl ReportSender {
    pub fn new(composer: ReportComposer, transport: Arc<dyn MailTransport>, mail_timeout: Duration) -> Self {
        Self { composer, transport, mail_timeout }
    }

    #[instrument(name = "send_daily_reports", skip_all, fields(users = reports.len(), on_close = true))]
    pub async fn send_all(&self, reports: &[UserReport]) -> Result<ReportDelivery, AppError> {
        let mut delivery = ReportDelivery::default();
        if reports.is_empty() {
            return Ok(delivery);
        }

        let verified = bounded(
            "verified recipient lookup",
            self.mail_timeout,
            self.transport.verified_recipients(),
        )
        .await?;

        for report in reports {
            if !verified.contains(&report.email.to_lowercase()) {
                warn!(user_id = report.user_id, "Recipient not verified, skipping daily report");
                delivery.skipped += 1;
                continue;
            }

            let message = match self.composer.compose(report) {
                Ok(message) => message,
                Err(e) => {
                    error!(user_id = report.user_id, ?e, "Failed to compose daily report");
                    delivery.failed += 1;
                    continue;
                }
            };

            match bounded("report send", self.mail_timeout, self.transport.send(&message)).await {
                Ok(()) => {
                    info!(user_id = report.user_id, commodities = report.commodities.len(), "Daily report sent");
                    delivery.sent += 1;
                }
                Err(e) => {
                    error!(user_id = report.user_id, ?e, "Failed to send daily report");
                    delivery.failed += 1;
                }
            }
        }

        Ok(delivery)
    }
}
