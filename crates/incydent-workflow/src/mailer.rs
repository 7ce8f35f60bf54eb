//! Mail transport.
//!
//! Atomic success/failure per message; no partial-recipient semantics.

use std::sync::Arc;

use async_trait::async_trait;
use incydent_core::SmtpConfig;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("No valid recipient addresses")]
    NoRecipients,

    #[error("Invalid sender address: {0}")]
    InvalidSender(String),

    #[error("Message build failed: {0}")]
    Build(String),

    #[error("Transport failed: {0}")]
    Transport(String),
}

/// Mail transport seam used by the workflow.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), SendError>;
}

/// SMTP transport over lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, SendError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| SendError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        let builder = builder.port(config.port);
        let builder = if let (Some(user), Some(password)) = (&config.username, &config.password) {
            builder.credentials(Credentials::new(user.clone(), password.clone()))
        } else {
            builder
        };
        info!(host = %config.host, port = config.port, "Mail transport initialized");

        Ok(SmtpMailer {
            mailer: Arc::new(builder.build()),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), SendError> {
        let to_addrs: Vec<Mailbox> = to.iter().filter_map(|s| s.parse().ok()).collect();
        if to_addrs.is_empty() {
            return Err(SendError::NoRecipients);
        }
        let from_addr: Mailbox = self
            .from
            .parse()
            .map_err(|_| SendError::InvalidSender(self.from.clone()))?;

        let mut builder = Message::builder().from(from_addr).subject(subject);
        for mailbox in &to_addrs {
            builder = builder.to(mailbox.clone());
        }
        let email = builder
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SendError::Build(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        info!(count = to.len(), "Report mail sent");
        Ok(())
    }
}
