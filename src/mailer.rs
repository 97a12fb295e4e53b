//! Outbound mail.
//!
//! Delivery is behind the `Mailer` trait. `LogMailer` writes each message to
//! the log instead of sending it; `MemoryMailer` keeps messages in memory for
//! tests and embedding.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::models::{IssuedToken, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    /// Welcome message carrying the activation token.
    pub fn welcome(user: &User, token: &IssuedToken) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Welcome to the blog!".to_string(),
            body: format!(
                "Hi {name},\n\n\
                 Thanks for signing up. Your user ID is {id}.\n\n\
                 To activate your account, send a PUT request to /api/v1/auth/activate with:\n\n\
                 {{\"token\": \"{token}\"}}\n\n\
                 This token expires at {expiry} and can only be used once.\n",
                name = user.name,
                id = user.id,
                token = token.plaintext,
                expiry = token.expiry.to_rfc3339(),
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Writes messages to the log. The body is only emitted at debug level.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        if mail.to.trim().is_empty() {
            return Err(MailError::Delivery("no recipient".into()));
        }
        tracing::info!(to = %mail.to, subject = %mail.subject, "Mail dispatched to log");
        tracing::debug!(to = %mail.to, body = %mail.body, "Mail body");
        Ok(())
    }
}

/// Collects messages in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Mail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Mail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail);
        Ok(())
    }
}

/// Send `mail` on a detached task. Failures are logged, never surfaced.
///
/// The send runs in its own task so a panicking mailer is contained and
/// logged too. The returned handle never yields an error.
pub fn send_in_background(mailer: Arc<dyn Mailer>, mail: Mail) -> JoinHandle<()> {
    let to = mail.to.clone();
    let delivery = tokio::spawn(async move { mailer.send(mail).await });

    tokio::spawn(async move {
        match delivery.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(to = %to, error = %e, "Background mail delivery failed");
            }
            Err(e) if e.is_panic() => {
                tracing::error!(to = %to, "Background mail delivery panicked");
            }
            Err(e) => {
                tracing::warn!(to = %to, error = %e, "Background mail delivery cancelled");
            }
        }
    })
}
