use crate::config::PlatformConfig;
use crate::error::ArchiveError;
use crate::model::{ArchiveFuture, QueryMode, RepositoryRecord};

/// Source of the deleted-repository list.
pub trait DeletionQuery: Send + Sync {
    fn deleted_repos<'a>(&'a self, mode: QueryMode) -> ArchiveFuture<'a, Vec<RepositoryRecord>>;
}

pub fn query_command(platform: &PlatformConfig, mode: QueryMode) -> &str {
    match mode {
        QueryMode::All => &platform.search_query_all,
        QueryMode::Recent => &platform.search_query_recent,
    }
}

/// Parses headerless `id,owner,name,name_with_owner,shard_path,has_wiki` rows.
pub fn parse_repository_rows(text: &str) -> Result<Vec<RepositoryRecord>, ArchiveError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    reader
        .deserialize::<RepositoryRecord>()
        .map(|row| row.map_err(|err| ArchiveError::Parse(err.to_string())))
        .collect()
}
