use crate::batch::{BatchRunner, partition_batches};
use crate::error::ArchiveError;
use crate::model::{QueryMode, RunSummary};
use crate::query::DeletionQuery;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Drives a full run: one query, then the batches strictly one after another.
pub struct Orchestrator {
    query: Arc<dyn DeletionQuery>,
    runner: Arc<dyn BatchRunner>,
    batch_size: usize,
}

impl Orchestrator {
    pub fn new(
        query: Arc<dyn DeletionQuery>,
        runner: Arc<dyn BatchRunner>,
        batch_size: usize,
    ) -> Self {
        Self {
            query,
            runner,
            batch_size,
        }
    }

    pub async fn run(&self, mode: QueryMode) -> Result<RunSummary, ArchiveError> {
        info!(mode = %mode, "Getting the list of deleted repos");
        let repos = match self.query.deleted_repos(mode).await {
            Ok(repos) => repos,
            Err(err) => {
                error!(error = %err, "Cannot get the list of repositories");
                return Err(err);
            }
        };

        let total = repos.len();
        let batches = partition_batches(repos, self.batch_size);
        let batch_count = batches.len();
        debug!(
            repos = total,
            batches = batch_count,
            batch_size = self.batch_size,
            "Divided repositories into batches"
        );

        for (index, batch) in batches.into_iter().enumerate() {
            if let Err(err) = self.runner.run_batch(batch).await {
                error!(
                    batch = index + 1,
                    batches = batch_count,
                    error = %err,
                    "Unable to process a batch of repositories"
                );
                return Err(err);
            }
        }

        info!(batches = batch_count, repos = total, "Processed all batches");
        Ok(RunSummary {
            batches: batch_count,
            repos: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::tests::repos;
    use crate::model::{ArchiveFuture, RepositoryRecord};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedQuery {
        repos: Option<Vec<RepositoryRecord>>,
        modes: Mutex<Vec<QueryMode>>,
    }

    impl FixedQuery {
        fn returning(repos: Vec<RepositoryRecord>) -> Self {
            Self {
                repos: Some(repos),
                modes: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                repos: None,
                modes: Mutex::new(Vec::new()),
            }
        }
    }

    impl DeletionQuery for FixedQuery {
        fn deleted_repos<'a>(
            &'a self,
            mode: QueryMode,
        ) -> ArchiveFuture<'a, Vec<RepositoryRecord>> {
            Box::pin(async move {
                self.modes.lock().unwrap().push(mode);
                self.repos
                    .clone()
                    .ok_or_else(|| ArchiveError::Query("connection refused".into()))
            })
        }
    }

    #[derive(Default)]
    struct RecordingRunner {
        batches: Mutex<Vec<Vec<String>>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl BatchRunner for RecordingRunner {
        fn run_batch<'a>(&'a self, batch: Vec<RepositoryRecord>) -> ArchiveFuture<'a, usize> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err(ArchiveError::Alert("Oops! An Error".into()));
                }
                let size = batch.len();
                self.batches
                    .lock()
                    .unwrap()
                    .push(batch.into_iter().map(|repo| repo.id).collect());
                Ok(size)
            })
        }
    }

    #[tokio::test]
    async fn processes_all_batches_in_order() {
        let query = Arc::new(FixedQuery::returning(repos(52)));
        let runner = Arc::new(RecordingRunner::default());
        let orchestrator = Orchestrator::new(query.clone(), runner.clone(), 5);

        let summary = orchestrator.run(QueryMode::All).await.unwrap();

        assert_eq!(summary, RunSummary { batches: 11, repos: 52 });
        assert_eq!(runner.calls.load(Ordering::SeqCst), 11);
        let seen: Vec<String> = runner.batches.lock().unwrap().concat();
        let expected: Vec<String> = (0..52).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);
        assert_eq!(runner.batches.lock().unwrap()[10].len(), 2);
        assert_eq!(*query.modes.lock().unwrap(), vec![QueryMode::All]);
    }

    #[tokio::test]
    async fn aborts_on_first_batch_failure() {
        let query = Arc::new(FixedQuery::returning(repos(52)));
        let runner = Arc::new(RecordingRunner {
            fail: true,
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(query, runner.clone(), 5);

        let err = orchestrator.run(QueryMode::Recent).await.unwrap_err();

        assert!(matches!(err, ArchiveError::Alert(message) if message == "Oops! An Error"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn query_failure_starts_no_batches() {
        let query = Arc::new(FixedQuery::failing());
        let runner = Arc::new(RecordingRunner::default());
        let orchestrator = Orchestrator::new(query, runner.clone(), 5);

        let err = orchestrator.run(QueryMode::All).await.unwrap_err();

        assert!(matches!(err, ArchiveError::Query(_)));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_list_is_a_successful_run() {
        let query = Arc::new(FixedQuery::returning(Vec::new()));
        let runner = Arc::new(RecordingRunner::default());
        let orchestrator = Orchestrator::new(query, runner.clone(), 5);

        let summary = orchestrator.run(QueryMode::Recent).await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }
}
