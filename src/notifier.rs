//! Outcome reports mailed to the pusher.
//!
//! The transport sits behind the `Mailer` trait so the pipeline only depends
//! on a `send(to, subject, body)` capability. Send failures are logged and
//! absorbed; they never change a pipeline result that was already decided.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, warn};

use crate::config::EmailConfig;
use crate::error::{HookError, Result};
use crate::webhook::WebhookEvent;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP-backed mailer built from the `[email]` config section.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds the mailer when reports are enabled and the transport is fully
    /// configured; returns `None` (with a warning for half-configured setups)
    /// otherwise.
    pub fn from_config(email: &EmailConfig) -> Result<Option<Self>> {
        if !email.sendreports {
            return Ok(None);
        }

        let (Some(sender), Some(smtp)) = (&email.sender, &email.smtp) else {
            warn!("email.sendreports is set but email.sender or email.smtp is missing; reports disabled");
            return Ok(None);
        };

        let from: Mailbox = sender
            .parse()
            .map_err(|e| HookError::ConfigError(format!("Invalid email.sender '{sender}': {e}")))?;

        let mut builder = match (&smtp.username, &smtp.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                    .map_err(|e| HookError::MailError(e.to_string()))?
                    .credentials(Credentials::new(username.clone(), password.clone()))
            }
            // No credentials: plain transport, e.g. a local relay.
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host),
        };
        builder = builder.port(smtp.port);

        Ok(Some(SmtpMailer {
            transport: builder.build(),
            from,
        }))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| HookError::MailError(format!("Invalid recipient '{to}': {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| HookError::MailError(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| HookError::MailError(e.to_string()))?;
        Ok(())
    }
}

/// Sends outcome reports to the triggering committer.
#[derive(Clone)]
pub struct Notifier {
    mailer: Option<Arc<dyn Mailer>>,
}

impl Notifier {
    pub fn new(mailer: Option<Arc<dyn Mailer>>) -> Self {
        Notifier { mailer }
    }

    /// A notifier that never sends anything.
    pub fn disabled() -> Self {
        Notifier { mailer: None }
    }

    /// No-op unless reports are enabled and the event carries a pusher email.
    pub async fn notify(&self, body: &str, subject: &str, event: &WebhookEvent) {
        let Some(mailer) = &self.mailer else {
            return;
        };
        let Some(to) = &event.pusher_email else {
            return;
        };

        match mailer.send(to, subject, body).await {
            Ok(()) => debug!("Report sent to {}", to),
            Err(e) => error!("Failed to send report to {}: {}", to, e),
        }
    }
}
