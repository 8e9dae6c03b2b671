use crate::error::ArchiveError;
use crate::paths::DEFAULT_DATA_PREFIX;
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub platform: PlatformConfig,
    pub ssh_private_key: SshKeyConfig,
    pub dir: DirConfig,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub email: EmailConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub search_query_all: String,
    pub search_query_recent: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SshKeyConfig {
    pub file: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirConfig {
    pub archive: PathBuf,
    pub snapshots: PathBuf,
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub recipients: Vec<String>,
    pub sender: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    pub dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_retention")]
    pub retention: usize,
}

fn default_batch_size() -> usize {
    5
}

fn default_ssh_port() -> u16 {
    22
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_data_prefix() -> String {
    DEFAULT_DATA_PREFIX.to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_retention() -> usize {
    4
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = serde_json::from_str(&data).context("parse config")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ArchiveError> {
        if self.batch_size == 0 {
            return Err(ArchiveError::Config("batch_size must be at least 1".into()));
        }
        if self.platform.search_query_all.trim().is_empty()
            || self.platform.search_query_recent.trim().is_empty()
        {
            return Err(ArchiveError::Config(
                "platform search queries must not be empty".into(),
            ));
        }
        if self.dir.archive.as_os_str().is_empty() || self.dir.snapshots.as_os_str().is_empty() {
            return Err(ArchiveError::Config(
                "archive and snapshot directories must be set".into(),
            ));
        }
        Ok(())
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let project = ProjectDirs::from("com", "repo-archive", "repo-archive")
        .context("resolve project dirs")?;
    Ok(project.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{
        "platform": {
            "host": "ghe.example.com",
            "username": "admin",
            "search_query_all": "ghe-deleted --all",
            "search_query_recent": "ghe-deleted --recent"
        },
        "ssh_private_key": { "file": "/etc/archive/id_rsa" },
        "dir": { "archive": "/archive", "snapshots": "/snapshots/current" },
        "email": { "recipients": ["github-ops@example.com"], "sender": "github@example.com" },
        "log": { "dir": "/var/log/archive" }
    }"#;

    #[test]
    fn loads_config_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, MINIMAL).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.platform.port, 22);
        assert_eq!(config.platform.timeout_secs, 30);
        assert_eq!(config.dir.data_prefix, "/data/");
        assert_eq!(config.email.smtp_host, "localhost");
        assert_eq!(config.email.smtp_port, 25);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.retention, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = AppConfig::load(&tmp.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("read config"));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut config: AppConfig = serde_json::from_str(MINIMAL).unwrap();
        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(ArchiveError::Config(_))));
    }

    #[test]
    fn rejects_blank_query() {
        let mut config: AppConfig = serde_json::from_str(MINIMAL).unwrap();
        config.platform.search_query_recent = "  ".into();
        assert!(matches!(config.validate(), Err(ArchiveError::Config(_))));
    }
}
