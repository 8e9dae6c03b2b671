use crate::archive::RepositoryArchiver;
use crate::error::ArchiveError;
use crate::model::{ArchiveFuture, RepositoryRecord};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub trait BatchRunner: Send + Sync {
    /// Archives every repository of the batch, returning how many were processed.
    fn run_batch<'a>(&'a self, batch: Vec<RepositoryRecord>) -> ArchiveFuture<'a, usize>;
}

/// Runs all archivals of a batch at once. A failing repository does not
/// cancel its siblings; the batch waits for all of them and reports the
/// first failure it observed.
pub struct ConcurrentBatchRunner {
    archiver: Arc<dyn RepositoryArchiver>,
}

impl ConcurrentBatchRunner {
    pub fn new(archiver: Arc<dyn RepositoryArchiver>) -> Self {
        Self { archiver }
    }

    async fn run(&self, batch: Vec<RepositoryRecord>) -> Result<usize, ArchiveError> {
        let size = batch.len();
        debug!(size, "Process one batch of repos");

        let mut tasks = JoinSet::new();
        for repo in batch {
            let archiver = Arc::clone(&self.archiver);
            tasks.spawn(async move { archiver.archive(&repo).await.map(|_| ()) });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|err| ArchiveError::Join(err.to_string()))
                .and_then(|result| result);
            if let Err(err) = outcome {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!(error = %err, "Additional failure in batch");
                }
            }
        }

        match first_error {
            Some(err) => {
                error!(size, error = %err, "Cannot archive repository batch");
                Err(err)
            }
            None => {
                info!(size, "Processed a batch of repositories");
                Ok(size)
            }
        }
    }
}

impl BatchRunner for ConcurrentBatchRunner {
    fn run_batch<'a>(&'a self, batch: Vec<RepositoryRecord>) -> ArchiveFuture<'a, usize> {
        Box::pin(self.run(batch))
    }
}

/// Splits `repos` into consecutive batches of `size`; the last one holds the remainder.
pub fn partition_batches(repos: Vec<RepositoryRecord>, size: usize) -> Vec<Vec<RepositoryRecord>> {
    let size = size.max(1);
    let mut batches = Vec::with_capacity(repos.len().div_ceil(size));
    let mut repos = repos.into_iter().peekable();
    while repos.peek().is_some() {
        batches.push(repos.by_ref().take(size).collect());
    }
    batches
}
