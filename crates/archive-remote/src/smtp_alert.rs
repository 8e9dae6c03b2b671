use archive_core::alert::{AlertEmail, Alerter, compose_alert};
use archive_core::config::EmailConfig;
use archive_core::error::ArchiveError;
use archive_core::model::ArchiveFuture;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

/// Sends alert emails through an SMTP relay, unauthenticated and in plain text.
pub struct SmtpAlerter {
    host: String,
    port: u16,
}

impl SmtpAlerter {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn from_config(email: &EmailConfig) -> Self {
        Self::new(email.smtp_host.clone(), email.smtp_port)
    }

    async fn send(
        &self,
        recipients: &[String],
        sender: &str,
        error: &ArchiveError,
    ) -> Result<(), ArchiveError> {
        if recipients.is_empty() {
            debug!("No alert recipients configured");
            return Ok(());
        }
        let message = build_message(compose_alert(recipients, sender, error))?;
        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.host.as_str())
                .port(self.port)
                .build();
        transport
            .send(message)
            .await
            .map_err(|err| ArchiveError::Alert(err.to_string()))?;
        info!(recipients = ?recipients, "Alert email sent");
        Ok(())
    }
}

impl Alerter for SmtpAlerter {
    fn send_alert<'a>(
        &'a self,
        recipients: &'a [String],
        sender: &'a str,
        error: &'a ArchiveError,
    ) -> ArchiveFuture<'a, ()> {
        Box::pin(self.send(recipients, sender, error))
    }
}

fn build_message(email: AlertEmail) -> Result<Message, ArchiveError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject);
    for recipient in email.to.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        builder = builder.to(parse_mailbox(recipient)?);
    }
    builder
        .body(email.text)
        .map_err(|err| ArchiveError::Alert(err.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ArchiveError> {
    address
        .parse::<Mailbox>()
        .map_err(|err| ArchiveError::Alert(format!("invalid address {address:?}: {err}")))
}
