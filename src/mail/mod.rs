pub mod http_mailer;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::errors::AppError;

pub use http_mailer::HttpMailer;

/// A fully composed HTML email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound mail service that only delivers to verified identities
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Lowercased addresses the service will accept as recipients
    async fn verified_recipients(&self) -> Result<HashSet<String>, AppError>;

    async fn send(&self, message: &EmailMessage) -> Result<(), AppError>;
}
