use anyhow::{Context, Result};
use futures::future::BoxFuture;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::ContactMailer;
use super::contact::ContactMessage;
use crate::config::MailConfig;
use crate::constants::SMTP_MAX_RETRIES;
use crate::retry::{RetryConfig, with_retry_if};

/// Forwards submissions through an authenticated STARTTLS relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    retry: RetryConfig,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, username: &str, password: &str, recipient: &str) -> Result<Self> {
        let creds = Credentials::new(username.to_string(), password.to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .context("Failed to create SMTP transport")?
            .port(config.port)
            .credentials(creds)
            .authentication(vec![Mechanism::Plain, Mechanism::Login])
            .build();

        let from = username
            .parse::<Mailbox>()
            .context("Invalid from address (mail.username)")?;
        let to = recipient
            .parse::<Mailbox>()
            .context(format!("Invalid recipient address: {}", recipient))?;

        Ok(Self {
            transport,
            from,
            to,
            retry: RetryConfig::default().with_max_retries(SMTP_MAX_RETRIES),
        })
    }

    fn build(&self, contact: &ContactMessage) -> Result<Message> {
        let reply_to = contact
            .email
            .parse::<Mailbox>()
            .context(format!("Invalid reply-to address: {}", contact.email))?;

        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .reply_to(reply_to)
            .subject(contact.mail_subject())
            .header(ContentType::TEXT_HTML)
            .body(contact.html_body())
            .context("Failed to build email message")
    }

    async fn deliver(&self, contact: &ContactMessage) -> Result<()> {
        let message = self.build(contact)?;

        with_retry_if(
            &self.retry,
            || self.transport.send(message.clone()),
            |e: &lettre::transport::smtp::Error| e.is_transient(),
        )
        .await
        .context("Failed to send email")?;

        tracing::info!("Contact email from {} forwarded to {}", contact.email, self.to);
        Ok(())
    }
}

impl ContactMailer for SmtpMailer {
    fn send<'a>(&'a self, contact: &'a ContactMessage) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.deliver(contact))
    }
}
