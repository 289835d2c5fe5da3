use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::composer::AlertComposer;
use super::dispatcher::{DispatchReport, Dispatcher};
use super::matcher;
use super::store::SubscriptionStore;
use super::types::{AlertEvent, CustomerInfo, PriceEntry, PriceSnapshot};
use super::{bounded, AlertSettings};
use crate::errors::AppError;
use crate::mail::{EmailMessage, MailTransport};

/// Invocation payload: `{"body": [{"commodity_id": 1, "price": 95.0}, ...]}`
#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub body: Vec<PriceEntry>,
}

/// Status object returned to the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandlerResponse {
    fn message(status_code: u16, message: impl Into<String>) -> Self {
        Self { status_code, message: Some(message.into()), error: None }
    }

    fn error(error: impl Into<String>) -> Self {
        Self { status_code: 500, message: None, error: Some(error.into()) }
    }
}

/// Where a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertRunOutcome {
    NoSubscriptions,
    NoAlertsTriggered { checked: usize },
    NoCustomerInfo { alerts: usize },
    NothingComposed { alerts: usize },
    Dispatched(DispatchReport),
}

impl AlertRunOutcome {
    pub fn into_response(self) -> HandlerResponse {
        match self {
            AlertRunOutcome::NoSubscriptions => HandlerResponse::message(200, "No user commodities to check"),
            AlertRunOutcome::NoAlertsTriggered { checked } => {
                HandlerResponse::message(200, format!("No alerts triggered for {} user commodities", checked))
            }
            AlertRunOutcome::NoCustomerInfo { alerts } => {
                HandlerResponse::message(200, format!("No customer info resolved for {} alerts", alerts))
            }
            AlertRunOutcome::NothingComposed { alerts } => {
                HandlerResponse::message(500, format!("Failed to compose any of {} alert emails", alerts))
            }
            AlertRunOutcome::Dispatched(report) => {
                let summary = format!(
                    "Sent {} of {} alerts ({} skipped, {} failed)",
                    report.sent(),
                    report.total(),
                    report.skipped(),
                    report.failed()
                );
                // Nothing delivered and something broke
                let status = if report.sent() == 0 && report.failed() > 0 { 500 } else { 200 };
                HandlerResponse::message(status, summary)
            }
        }
    }
}

/// Parse and validate an invocation payload into a snapshot
pub fn parse_event(event: serde_json::Value) -> Result<PriceSnapshot, AppError> {
    let request: AlertRequest =
        serde_json::from_value(event).map_err(|e| AppError::InvalidPayload(e.to_string()))?;
    PriceSnapshot::from_entries(request.body)
}

/// Store read -> match -> resolve -> compose -> dispatch
pub struct AlertService {
    store: Arc<dyn SubscriptionStore>,
    composer: AlertComposer,
    dispatcher: Dispatcher,
    settings: AlertSettings,
}

impl AlertService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn MailTransport>,
        settings: AlertSettings,
    ) -> Result<Self, AppError> {
        let composer = AlertComposer::new(settings.dashboard_url.clone())?;
        let dispatcher = Dispatcher::new(Arc::clone(&store), transport, settings.clone());
        Ok(Self { store, composer, dispatcher, settings })
    }

    /// Entry point for one scheduled invocation
    pub async fn handle(&self, event: serde_json::Value) -> HandlerResponse {
        let snapshot = match parse_event(event) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(?e, "Rejected alert event");
                return HandlerResponse::error(e.to_string());
            }
        };

        match self.run(&snapshot).await {
            Ok(outcome) => outcome.into_response(),
            Err(e) => {
                error!(?e, "Alert run failed");
                HandlerResponse::error(e.to_string())
            }
        }
    }

    #[instrument(name = "alert_run", skip_all, fields(prices = snapshot.len(), on_close = true))]
    pub async fn run(&self, snapshot: &PriceSnapshot) -> Result<AlertRunOutcome, AppError> {
        let alerted_before = Utc::now() - self.settings.cooldown;
        let subscriptions = bounded(
            "subscription read",
            self.settings.db_timeout,
            self.store.eligible_subscriptions(alerted_before),
        )
        .await?;

        if subscriptions.is_empty() {
            info!("No user commodities to check");
            return Ok(AlertRunOutcome::NoSubscriptions);
        }

        let events = matcher::evaluate_batch(&subscriptions, snapshot);
        info!(checked = subscriptions.len(), triggered = events.len(), "Evaluated alert thresholds");

        if events.is_empty() {
            return Ok(AlertRunOutcome::NoAlertsTriggered { checked: subscriptions.len() });
        }

        let alert_count = events.len();
        let customer_infos = self.resolve_customer_info(events).await;
        if customer_infos.is_empty() {
            warn!(alerts = alert_count, "No customer info resolved for triggered alerts");
            return Ok(AlertRunOutcome::NoCustomerInfo { alerts: alert_count });
        }

        let resolved = customer_infos.len();
        let (messages, customer_infos) = self.compose_all(customer_infos);
        if messages.is_empty() {
            error!(alerts = resolved, "Every alert email failed to compose");
            return Ok(AlertRunOutcome::NothingComposed { alerts: resolved });
        }

        let report = self.dispatcher.dispatch(messages, customer_infos).await?;
        Ok(AlertRunOutcome::Dispatched(report))
    }

    /// Join each alert with its user and commodity, dropping the ones that fail
    async fn resolve_customer_info(&self, events: Vec<AlertEvent>) -> Vec<CustomerInfo> {
        let mut infos = Vec::with_capacity(events.len());
        for event in events {
            let key = event.subscription().key();
            match bounded("customer lookup", self.settings.db_timeout, self.store.customer_details(key)).await {
                Ok(Some(details)) => infos.push(CustomerInfo::new(event, details)),
                Ok(None) => warn!(
                    user_id = key.user_id,
                    commodity_id = key.commodity_id,
                    "User or commodity not found for subscription, skipping alert"
                ),
                Err(e) => error!(
                    user_id = key.user_id,
                    commodity_id = key.commodity_id,
                    ?e,
                    "Failed to load customer info, skipping alert"
                ),
            }
        }
        infos
    }

    fn compose_all(&self, customer_infos: Vec<CustomerInfo>) -> (Vec<EmailMessage>, Vec<CustomerInfo>) {
        let mut messages = Vec::with_capacity(customer_infos.len());
        let mut composed = Vec::with_capacity(customer_infos.len());
        for info in customer_infos {
            match self.composer.compose(&info) {
                Ok(message) => {
                    messages.push(message);
                    composed.push(info);
                }
                Err(e) => {
                    let key = info.key();
                    error!(user_id = key.user_id, commodity_id = key.commodity_id, ?e, "Failed to compose alert email");
                }
            }
        }
        (messages, composed)
    }
}
