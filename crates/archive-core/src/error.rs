use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot reach platform host: {0}")]
    Query(String),
    #[error("deleted repository query failed on platform host ({status}): {stderr}")]
    RemoteQuery { status: String, stderr: String },
    #[error("cannot parse the list of repositories: {0}")]
    Parse(String),
    #[error("cannot write to file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot pack {} into {}: {source}", .snapshot.display(), .archive.display())]
    Tarball {
        snapshot: PathBuf,
        archive: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read snapshot {}: {source}", .snapshot.display())]
    Snapshot {
        snapshot: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot send alert email: {0}")]
    Alert(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("archival task did not complete: {0}")]
    Join(String),
}

impl ArchiveError {
    /// Failures on the destination side of an archival. Unreadable snapshots
    /// are not included.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, ArchiveError::Write { .. } | ArchiveError::Tarball { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_names_the_destination() {
        let err = ArchiveError::Write {
            path: PathBuf::from("/archive/4663/23_johndoe_test-repo.tar"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let message = err.to_string();
        assert!(message.contains("/archive/4663/23_johndoe_test-repo.tar"));
        assert!(message.contains("denied"));
        assert!(err.is_write_failure());
    }

    #[test]
    fn query_errors_are_not_write_failures() {
        let err = ArchiveError::RemoteQuery {
            status: "exit status: 1".into(),
            stderr: "redis unavailable".into(),
        };
        assert!(!err.is_write_failure());
        assert!(err.to_string().contains("redis unavailable"));
    }

    #[test]
    fn unreadable_snapshot_does_not_page() {
        let err = ArchiveError::Snapshot {
            snapshot: PathBuf::from("/snapshots/current/data/repositories/177.git"),
            source: io::Error::new(io::ErrorKind::NotFound, "dangling link"),
        };
        assert!(!err.is_write_failure());
        assert!(err.to_string().contains("177.git"));
    }
}
