use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pivot_point::errors::AppError;
use pivot_point::mail::{EmailMessage, MailTransport};

/// Records every delivered message. Fails or stalls on the configured recipients.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    verified: Arc<Mutex<HashSet<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    fail_lookup: Arc<Mutex<bool>>,
}

impl RecordingTransport {
    pub fn verified(addresses: &[&str]) -> Self {
        let transport = Self::default();
        transport
            .verified
            .lock()
            .expect("lock verified")
            .extend(addresses.iter().map(|a| a.to_lowercase()));
        transport
    }

    pub fn fail_for(&self, address: &str) {
        self.failing.lock().expect("lock failing").insert(address.to_string());
    }

    /// Holds each send to `address` for `delay` before delivering it
    pub fn delay_for(&self, address: &str, delay: Duration) {
        self.delays.lock().expect("lock delays").insert(address.to_string(), delay);
    }

    pub fn fail_verified_lookup(&self) {
        *self.fail_lookup.lock().expect("lock flag") = true;
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("lock sent").clone()
    }

    pub fn sent_to(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.to).collect()
    }

    /// Every recipient `send` was called for, including failures
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().expect("lock attempts").clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn verified_recipients(&self) -> Result<HashSet<String>, AppError> {
        if *self.fail_lookup.lock().expect("lock flag") {
            return Err(AppError::Transport("identities endpoint unavailable".to_string()));
        }
        Ok(self.verified.lock().expect("lock verified").clone())
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        self.attempts.lock().expect("lock attempts").push(message.to.clone());
        let delay = self.delays.lock().expect("lock delays").get(&message.to).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().expect("lock failing").contains(&message.to) {
            return Err(AppError::Transport(format!("relay rejected {}", message.to)));
        }
        self.sent.lock().expect("lock sent").push(message.clone());
        Ok(())
    }
}
