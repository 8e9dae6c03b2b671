use crate::error::ArchiveError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

pub type ArchiveFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ArchiveError>> + Send + 'a>>;

/// One row of the deleted-repository query, in column order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub name_with_owner: String,
    pub shard_path: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub has_wiki: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(D::Error::custom(format!("invalid has_wiki value {other:?}"))),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum QueryMode {
    All,
    Recent,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::All => "all",
            QueryMode::Recent => "recent",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathPair {
    pub code: PathBuf,
    pub wiki: PathBuf,
}

/// Every filesystem location touched while archiving one repository.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathSet {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub dir: String,
    pub snapshot: PathPair,
    pub archive: PathPair,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TarballOutcome {
    Archived { source: PathBuf, archive: PathBuf },
    SkippedNotFound { source: PathBuf },
}

impl TarballOutcome {
    pub fn is_archived(&self) -> bool {
        matches!(self, TarballOutcome::Archived { .. })
    }
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct RunSummary {
    pub batches: usize,
    pub repos: usize,
}
