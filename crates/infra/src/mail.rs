//! Outbound mail collaborator.
//!
//! Delivery is best-effort: callers go through [`deliver_best_effort`], which
//! logs failures and never propagates them.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

/// A plain-text message. Bodies may carry secrets and are never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl core::fmt::Debug for MailMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MailMessage")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

#[async_trait]
impl<M> Mailer for std::sync::Arc<M>
where
    M: Mailer + ?Sized,
{
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        (**self).send(message).await
    }
}

/// Send `message`, logging (not returning) any failure.
pub async fn deliver_best_effort<M: Mailer + ?Sized>(mailer: &M, message: MailMessage) {
    let to = message.to.clone();
    let subject = message.subject.clone();
    match mailer.send(message).await {
        Ok(()) => info!(to = %to, subject = %subject, "mail sent"),
        Err(e) => warn!(to = %to, subject = %subject, error = %e, "mail delivery failed; continuing"),
    }
}

/// Mailer that only records the envelope in the log. Used when no relay is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "outbound mail (log only)"
        );
        Ok(())
    }
}

/// Mailer that keeps every message in memory for tests/dev.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail (nothing is recorded while failing).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError("relay refused connection".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError("recorder lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}
