pub mod smtp_alert;
pub mod ssh_query;

pub use smtp_alert::SmtpAlerter;
pub use ssh_query::SshDeletionQuery;
