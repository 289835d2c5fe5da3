use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{EmailMessage, MailTransport};
use crate::config::Config;
use crate::errors::AppError;

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifiedIdentitiesResponse {
    identities: Vec<String>,
}

/// JSON-over-HTTP mail relay client.
///
/// Sends are never retried here: a retry after a timed-out but delivered
/// request would mail the user twice. The verified set comes from config when
/// `VERIFIED_RECIPIENTS` is set, else from the relay's `identities` endpoint.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    http_client: Client,
    base_url: Url,
    api_key: String,
    sender: String,
    configured_recipients: HashSet<String>,
}

impl HttpMailer {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let (api_url, api_key) = config.require_mail_api()?;
        let sender = config.require_sender_email()?;

        // Keep the last path segment when joining endpoints
        let base_url = Url::parse(&format!("{}/", api_url.trim_end_matches('/')))
            .map_err(|e| AppError::Config(format!("Invalid MAIL_API_URL: {}", e)))?;

        let http_client = Client::builder()
            .timeout(config.mail_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create mail HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            api_key: api_key.to_string(),
            sender: sender.to_string(),
            configured_recipients: config.verified_recipients.iter().cloned().collect(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("Invalid mail endpoint {}: {}", path, e)))
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    #[instrument(skip(self))]
    async fn verified_recipients(&self) -> Result<HashSet<String>, AppError> {
        if !self.configured_recipients.is_empty() {
            return Ok(self.configured_recipients.clone());
        }

        let response = self
            .http_client
            .get(self.endpoint("identities")?)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Transport(format!("Failed to list verified identities: {}", e)))?;

        let body: VerifiedIdentitiesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("Malformed identities response: {}", e)))?;

        debug!(count = body.identities.len(), "Loaded verified identities from mail relay");
        Ok(body.identities.into_iter().map(|s| s.trim().to_lowercase()).collect())
    }

    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        let request = SendEmailRequest {
            from: &self.sender,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        self.http_client
            .post(self.endpoint("send")?)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Transport(e.to_string()))?;

        Ok(())
    }
}
