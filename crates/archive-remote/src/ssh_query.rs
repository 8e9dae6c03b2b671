//! Deleted-repository query executed on the platform host over SSH.
//!
//! The system `ssh` client does the transport; this module only builds the
//! invocation, bounds it in time and classifies the result. Exit status 255 is
//! what `ssh` itself reports for connection and authentication problems, so it
//! counts as a transport failure rather than a failing remote command.

use archive_core::config::{PlatformConfig, SshKeyConfig};
use archive_core::error::ArchiveError;
use archive_core::model::{ArchiveFuture, QueryMode, RepositoryRecord};
use archive_core::query::{DeletionQuery, parse_repository_rows, query_command};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};

const SSH_TRANSPORT_FAILURE: i32 = 255;

pub struct SshDeletionQuery {
    platform: PlatformConfig,
    key_file: PathBuf,
}

impl SshDeletionQuery {
    pub fn new(platform: PlatformConfig, key: &SshKeyConfig) -> Self {
        Self {
            platform,
            key_file: key.file.clone(),
        }
    }

    fn ssh_args(&self, command: &str) -> Vec<String> {
        vec![
            "-p".into(),
            self.platform.port.to_string(),
            "-i".into(),
            self.key_file.display().to_string(),
            "-l".into(),
            self.platform.username.clone(),
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.platform.timeout_secs),
            self.platform.host.clone(),
            command.to_string(),
        ]
    }

    async fn query(&self, mode: QueryMode) -> Result<Vec<RepositoryRecord>, ArchiveError> {
        let command = query_command(&self.platform, mode);
        debug!(
            host = %self.platform.host,
            command = %command,
            "Executing command on platform host"
        );

        let mut ssh = Command::new("ssh");
        ssh.args(self.ssh_args(command))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.platform.timeout_secs);
        let output = match tokio::time::timeout(timeout, ssh.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                error!(error = %err, "Error while connecting to platform host");
                return Err(ArchiveError::Query(format!("spawn ssh: {err}")));
            }
            Err(_) => {
                error!(
                    timeout_secs = self.platform.timeout_secs,
                    "Deleted repository query timed out"
                );
                return Err(ArchiveError::Query(format!(
                    "no answer from {} within {}s",
                    self.platform.host, self.platform.timeout_secs
                )));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.status.code() == Some(SSH_TRANSPORT_FAILURE) {
            error!(stderr = %stderr, "Error while connecting to platform host");
            return Err(ArchiveError::Query(stderr));
        }
        if !output.status.success() {
            error!(
                status = %output.status,
                stderr = %stderr,
                "Error while querying platform host for deleted repositories"
            );
            return Err(ArchiveError::RemoteQuery {
                status: output.status.to_string(),
                stderr,
            });
        }

        let repos = parse_repository_rows(&String::from_utf8_lossy(&output.stdout))?;
        info!(count = repos.len(), "Found deleted repositories");
        Ok(repos)
    }
}

impl DeletionQuery for SshDeletionQuery {
    fn deleted_repos<'a>(&'a self, mode: QueryMode) -> ArchiveFuture<'a, Vec<RepositoryRecord>> {
        Box::pin(self.query(mode))
    }
}
