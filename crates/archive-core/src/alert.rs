use crate::error::ArchiveError;
use crate::model::ArchiveFuture;

pub const ALERT_SUBJECT: &str = "Backup of deleted repositories failed!";

/// Notifies operators that an archival failed.
pub trait Alerter: Send + Sync {
    fn send_alert<'a>(
        &'a self,
        recipients: &'a [String],
        sender: &'a str,
        error: &'a ArchiveError,
    ) -> ArchiveFuture<'a, ()>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlertEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

pub fn compose_alert(recipients: &[String], sender: &str, error: &ArchiveError) -> AlertEmail {
    AlertEmail {
        from: sender.to_string(),
        to: recipients.join(","),
        subject: ALERT_SUBJECT.to_string(),
        text: format!("archive-cli encountered the error below.\n\n{error}"),
    }
}
