use crate::error::ArchiveError;
use crate::model::{ArchiveFuture, PathSet, RepositoryRecord, TarballOutcome};
use crate::paths::ArchiveLayout;
use crate::tarball::Tarballer;
use std::sync::Arc;
use tracing::{debug, error, info};

pub trait RepositoryArchiver: Send + Sync {
    fn archive<'a>(&'a self, repo: &'a RepositoryRecord) -> ArchiveFuture<'a, RepoArchiveReport>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepoArchiveReport {
    pub paths: PathSet,
    pub code: TarballOutcome,
    pub wiki: TarballOutcome,
}

/// Archives the code snapshot of a repository, then its wiki snapshot.
pub struct SnapshotArchiver {
    layout: ArchiveLayout,
    tarballer: Arc<dyn Tarballer>,
}

impl SnapshotArchiver {
    pub fn new(layout: ArchiveLayout, tarballer: Arc<dyn Tarballer>) -> Self {
        Self { layout, tarballer }
    }

    async fn archive_repo(
        &self,
        repo: &RepositoryRecord,
    ) -> Result<RepoArchiveReport, ArchiveError> {
        info!(repo_id = %repo.id, repo = %repo.name_with_owner, "Processing repo");
        let paths = self.layout.resolve(repo);
        debug!(paths = ?paths, has_wiki = repo.has_wiki, "Resolved repo paths");

        let result = self.archive_snapshots(&paths).await;
        match result {
            Ok((code, wiki)) => {
                info!(
                    repo_id = %repo.id,
                    repo = %repo.name_with_owner,
                    archive = %paths.archive.code.display(),
                    code_archived = code.is_archived(),
                    wiki_archived = wiki.is_archived(),
                    "Repo is archived"
                );
                Ok(RepoArchiveReport { paths, code, wiki })
            }
            Err(err) => {
                error!(
                    repo_id = %repo.id,
                    repo = %repo.name_with_owner,
                    error = %err,
                    "Cannot archive repository"
                );
                Err(err)
            }
        }
    }

    async fn archive_snapshots(
        &self,
        paths: &PathSet,
    ) -> Result<(TarballOutcome, TarballOutcome), ArchiveError> {
        let code = self
            .tarballer
            .create_tarball(&paths.snapshot.code, &paths.archive.code)
            .await?;
        let wiki = self
            .tarballer
            .create_tarball(&paths.snapshot.wiki, &paths.archive.wiki)
            .await?;
        Ok((code, wiki))
    }
}

impl RepositoryArchiver for SnapshotArchiver {
    fn archive<'a>(&'a self, repo: &'a RepositoryRecord) -> ArchiveFuture<'a, RepoArchiveReport> {
        Box::pin(self.archive_repo(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct ScriptedTarballer {
        results: Mutex<VecDeque<Result<(), ArchiveError>>>,
        calls: Mutex<Vec<(PathBuf, PathBuf)>>,
    }

    impl ScriptedTarballer {
        fn new(results: Vec<Result<(), ArchiveError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Tarballer for ScriptedTarballer {
        fn create_tarball<'a>(
            &'a self,
            snapshot: &'a Path,
            archive: &'a Path,
        ) -> ArchiveFuture<'a, TarballOutcome> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((snapshot.to_path_buf(), archive.to_path_buf()));
                let next = self.results.lock().unwrap().pop_front().unwrap_or(Ok(()));
                next.map(|()| TarballOutcome::Archived {
                    source: snapshot.to_path_buf(),
                    archive: archive.to_path_buf(),
                })
            })
        }
    }

    fn repo() -> RepositoryRecord {
        RepositoryRecord {
            id: "123".into(),
            owner: "jdoe".into(),
            name: "my-new-repo".into(),
            name_with_owner: "jdoe/my-new-repo".into(),
            shard_path: "/data/repositories/5/nw/5b/5a/123.git".into(),
            has_wiki: true,
        }
    }

    fn write_error(path: &str) -> ArchiveError {
        ArchiveError::Write {
            path: PathBuf::from(path),
            source: io::Error::other("Oops! An Error"),
        }
    }

    fn archiver(tarballer: Arc<ScriptedTarballer>) -> SnapshotArchiver {
        let layout = ArchiveLayout::new(PathBuf::from("/archive"), PathBuf::from("/snap"));
        SnapshotArchiver::new(layout, tarballer)
    }

    #[tokio::test]
    async fn code_failure_skips_wiki() {
        let tarballer = Arc::new(ScriptedTarballer::new(vec![Err(write_error("code.tar"))]));
        let err = archiver(tarballer.clone()).archive(&repo()).await.unwrap_err();

        assert!(matches!(err, ArchiveError::Write { path, .. } if path == Path::new("code.tar")));
        assert_eq!(tarballer.calls().len(), 1);
    }

    #[tokio::test]
    async fn wiki_failure_is_reported_after_two_calls() {
        let tarballer = Arc::new(ScriptedTarballer::new(vec![
            Ok(()),
            Err(write_error("wiki.tar")),
        ]));
        let err = archiver(tarballer.clone()).archive(&repo()).await.unwrap_err();

        assert!(matches!(err, ArchiveError::Write { path, .. } if path == Path::new("wiki.tar")));
        assert_eq!(tarballer.calls().len(), 2);
    }

    #[tokio::test]
    async fn archives_repo_then_wiki() {
        let tarballer = Arc::new(ScriptedTarballer::new(Vec::new()));
        let report = archiver(tarballer.clone()).archive(&repo()).await.unwrap();

        let calls = tarballer.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, PathBuf::from("/snap/repositories/5/nw/5b/5a/123.git"));
        assert_eq!(calls[0].1, report.paths.archive.code);
        assert_eq!(
            calls[1].0,
            PathBuf::from("/snap/repositories/5/nw/5b/5a/123.wiki.git")
        );
        assert_eq!(calls[1].1, report.paths.archive.wiki);
        assert!(report.code.is_archived());
        assert!(report.wiki.is_archived());
    }
}
