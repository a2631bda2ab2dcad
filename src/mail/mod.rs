//! Contact form forwarding

mod contact;
mod smtp;

pub use contact::{ContactError, ContactForm, ContactMessage};
pub use smtp::SmtpMailer;

use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::config::MailConfig;

/// Delivers validated contact submissions
pub trait ContactMailer: Send + Sync {
    fn send<'a>(&'a self, contact: &'a ContactMessage) -> BoxFuture<'a, Result<()>>;

    /// False when submissions are accepted but not delivered anywhere
    fn forwards(&self) -> bool {
        true
    }
}

/// Used when no SMTP credentials are configured: submissions are only logged
pub struct LogMailer;

impl ContactMailer for LogMailer {
    fn send<'a>(&'a self, contact: &'a ContactMessage) -> BoxFuture<'a, Result<()>> {
        tracing::info!(
            name = %contact.name,
            email = %contact.email,
            subject = %contact.subject,
            "Contact form submission (SMTP not configured, not forwarded)"
        );
        Box::pin(async { Ok(()) })
    }

    fn forwards(&self) -> bool {
        false
    }
}

/// Pick the mailer for this configuration
pub fn mailer_from_config(config: &MailConfig, default_recipient: &str) -> Result<Arc<dyn ContactMailer>> {
    match config.credentials() {
        Some((username, password)) => {
            let recipient = config.recipient.as_deref().unwrap_or(default_recipient);
            tracing::info!("Contact submissions go to {} via {}", recipient, config.server);
            Ok(Arc::new(SmtpMailer::new(config, username, password, recipient)?))
        }
        None => {
            tracing::warn!("EMAIL_USER/EMAIL_PASSWORD not set; contact submissions will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
