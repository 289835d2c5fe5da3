use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::store::SubscriptionStore;
use super::types::{CustomerInfo, SubscriptionKey};
use super::{bounded, AlertSettings};
use crate::errors::AppError;
use crate::mail::{EmailMessage, MailTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The transport only delivers to verified identities
    Unverified,
    /// Another run holds the claim or alerted within the cooldown
    AlreadyClaimed,
}

/// Terminal state of one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { key: SubscriptionKey, cooldown_recorded: bool },
    Skipped { key: SubscriptionKey, reason: SkipReason },
    Failed { key: SubscriptionKey, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, DispatchOutcome::Sent { .. })).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, DispatchOutcome::Skipped { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, DispatchOutcome::Failed { .. })).count()
    }
}

/// Delivers composed alerts one recipient at a time.
/// A failure for one recipient never stops the rest of the batch.
pub struct Dispatcher {
    store: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn MailTransport>,
    settings: AlertSettings,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn SubscriptionStore>, transport: Arc<dyn MailTransport>, settings: AlertSettings) -> Self {
        Self { store, transport, settings }
    }

    /// `messages[i]` is the composed email for `customer_infos[i]`
    #[instrument(name = "dispatch_alerts", skip_all, fields(count = messages.len(), on_close = true))]
    pub async fn dispatch(
        &self,
        messages: Vec<EmailMessage>,
        customer_infos: Vec<CustomerInfo>,
    ) -> Result<DispatchReport, AppError> {
        if messages.len() != customer_infos.len() {
            return Err(AppError::InvalidPayload(format!(
                "{} messages for {} customer infos",
                messages.len(),
                customer_infos.len()
            )));
        }

        let verified = bounded(
            "verified recipient lookup",
            self.settings.mail_timeout,
            self.transport.verified_recipients(),
        )
        .await?;

        let mut report = DispatchReport::default();
        for (message, info) in messages.iter().zip(customer_infos.iter()) {
            let key = info.key();
            let recipient = message.to.trim().to_lowercase();

            // Pending -> Skipped when the transport would reject the address
            if !verified.contains(&recipient) {
                warn!(
                    user_id = key.user_id,
                    commodity_id = key.commodity_id,
                    recipient = %message.to,
                    "Recipient is not verified with the mail transport, skipping"
                );
                report.outcomes.push(DispatchOutcome::Skipped { key, reason: SkipReason::Unverified });
                continue;
            }

            report.outcomes.push(self.deliver(key, message).await);
        }

        info!(
            sent = report.sent(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Alert dispatch finished"
        );
        Ok(report)
    }

    async fn deliver(&self, key: SubscriptionKey, message: &EmailMessage) -> DispatchOutcome {
        let now = Utc::now();
        let alerted_before = now - self.settings.cooldown;
        let claim_expired_before = now - self.settings.claim_ttl;

        match bounded(
            "subscription claim",
            self.settings.db_timeout,
            self.store.claim(key, alerted_before, claim_expired_before),
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    user_id = key.user_id,
                    commodity_id = key.commodity_id,
                    "Subscription already claimed or alerted by another run, skipping"
                );
                return DispatchOutcome::Skipped { key, reason: SkipReason::AlreadyClaimed };
            }
            Err(e) => {
                error!(user_id = key.user_id, commodity_id = key.commodity_id, ?e, "Failed to claim subscription");
                return DispatchOutcome::Failed { key, error: e.to_string() };
            }
        }

        match bounded("alert send", self.settings.mail_timeout, self.transport.send(message)).await {
            Ok(()) => {
                info!(user_id = key.user_id, commodity_id = key.commodity_id, recipient = %message.to, "Alert email sent");

                // The email is out, a failed write here is only logged
                let cooldown_recorded = match bounded(
                    "cooldown update",
                    self.settings.db_timeout,
                    self.store.record_alerted(key, Utc::now()),
                )
                .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            user_id = key.user_id,
                            commodity_id = key.commodity_id,
                            ?e,
                            "Alert sent but failed to record alerted_at"
                        );
                        false
                    }
                };
                DispatchOutcome::Sent { key, cooldown_recorded }
            }
            Err(e) => {
                error!(
                    user_id = key.user_id,
                    commodity_id = key.commodity_id,
                    recipient = %message.to,
                    ?e,
                    "Failed to send alert email"
                );
                if let Err(release_err) = bounded(
                    "claim release",
                    self.settings.db_timeout,
                    self.store.release_claim(key),
                )
                .await
                {
                    warn!(
                        user_id = key.user_id,
                        commodity_id = key.commodity_id,
                        ?release_err,
                        "Failed to release claim, it will expire on its own"
                    );
                }
                DispatchOutcome::Failed { key, error: e.to_string() }
            }
        }
    }
}
