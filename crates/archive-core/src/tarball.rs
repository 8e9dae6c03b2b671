//! Packs one snapshot directory into a tar file.
//!
//! The destination is opened before the snapshot path is resolved so that an
//! unwritable archive location is always reported, even for repositories whose
//! snapshot does not exist yet. A missing snapshot is not a failure: the platform
//! simply has not backed that repository up, and the run moves on.

use crate::alert::Alerter;
use crate::error::ArchiveError;
use crate::model::{ArchiveFuture, TarballOutcome};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::OpenOptions;
use tracing::{debug, error, info, warn};

pub trait Tarballer: Send + Sync {
    fn create_tarball<'a>(
        &'a self,
        snapshot: &'a Path,
        archive: &'a Path,
    ) -> ArchiveFuture<'a, TarballOutcome>;
}

pub struct TarballProducer {
    alerter: Arc<dyn Alerter>,
    recipients: Vec<String>,
    sender: String,
}

impl TarballProducer {
    pub fn new(alerter: Arc<dyn Alerter>, recipients: Vec<String>, sender: String) -> Self {
        Self {
            alerter,
            recipients,
            sender,
        }
    }

    async fn produce(
        &self,
        snapshot: &Path,
        archive: &Path,
    ) -> Result<TarballOutcome, ArchiveError> {
        match write_archive(snapshot, archive).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(archive = %archive.display(), error = %err, "Cannot create tarball");
                if err.is_write_failure() {
                    self.alert(&err).await;
                }
                Err(err)
            }
        }
    }

    async fn alert(&self, err: &ArchiveError) {
        debug!(recipients = ?self.recipients, "Sending alert email");
        match self
            .alerter
            .send_alert(&self.recipients, &self.sender, err)
            .await
        {
            Ok(()) => info!(recipients = ?self.recipients, "Alert email sent"),
            Err(alert_err) => {
                warn!(
                    recipients = ?self.recipients,
                    error = %alert_err,
                    "Cannot send alert email"
                )
            }
        }
    }
}

impl Tarballer for TarballProducer {
    fn create_tarball<'a>(
        &'a self,
        snapshot: &'a Path,
        archive: &'a Path,
    ) -> ArchiveFuture<'a, TarballOutcome> {
        Box::pin(self.produce(snapshot, archive))
    }
}

async fn write_archive(snapshot: &Path, archive: &Path) -> Result<TarballOutcome, ArchiveError> {
    let write_error = |source| ArchiveError::Write {
        path: archive.to_path_buf(),
        source,
    };
    if let Some(dir) = archive.parent() {
        // create_dir_all tolerates a sibling task creating the same fan-out dir
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ArchiveError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
    }
    let (file, created) = open_destination(archive).await.map_err(write_error)?;

    let resolved = match tokio::fs::canonicalize(snapshot).await {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!(
                snapshot = %snapshot.display(),
                error = %err,
                "Repo not yet backed up to the snapshot"
            );
            drop(file);
            // an archive left by an earlier run stays untouched
            if created {
                if let Err(err) = tokio::fs::remove_file(archive).await {
                    debug!(
                        archive = %archive.display(),
                        error = %err,
                        "Cannot remove unused archive file"
                    );
                }
            }
            return Ok(TarballOutcome::SkippedNotFound {
                source: snapshot.to_path_buf(),
            });
        }
    };
    if resolved != snapshot {
        info!(
            snapshot = %snapshot.display(),
            resolved = %resolved.display(),
            "Snapshot resolves to"
        );
    }

    file.set_len(0).await.map_err(write_error)?;
    info!(archive = %archive.display(), "Creating tarball");
    let file = file.into_std().await;
    let source = resolved.clone();
    let packed = tokio::task::spawn_blocking(move || pack_directory(&source, file))
        .await
        .map_err(|err| ArchiveError::Join(err.to_string()))?;
    match packed {
        Ok(()) => {}
        Err(PackFailure::Snapshot(source)) => {
            return Err(ArchiveError::Snapshot {
                snapshot: resolved,
                source,
            });
        }
        Err(PackFailure::Destination(source)) => {
            return Err(ArchiveError::Tarball {
                snapshot: resolved,
                archive: archive.to_path_buf(),
                source,
            });
        }
    }

    info!(
        snapshot = %resolved.display(),
        archive = %archive.display(),
        "Directory archived"
    );
    Ok(TarballOutcome::Archived {
        source: resolved,
        archive: archive.to_path_buf(),
    })
}

/// Opens `archive` for writing without truncating it; the flag tells whether
/// this call created the file.
async fn open_destination(archive: &Path) -> io::Result<(tokio::fs::File, bool)> {
    match OpenOptions::new().write(true).create_new(true).open(archive).await {
        Ok(file) => Ok((file, true)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            let file = OpenOptions::new().write(true).open(archive).await?;
            Ok((file, false))
        }
        Err(err) => Err(err),
    }
}

#[derive(Debug)]
enum PackFailure {
    Snapshot(io::Error),
    Destination(io::Error),
}

/// Remembers whether the destination ever refused a write, so a failed walk
/// can be blamed on the right side.
struct TrackedWriter<W> {
    inner: W,
    failed: Arc<AtomicBool>,
}

impl<W: Write> Write for TrackedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .write(buf)
            .inspect_err(|_| self.failed.store(true, Ordering::Relaxed))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .flush()
            .inspect_err(|_| self.failed.store(true, Ordering::Relaxed))
    }
}

fn pack_directory(source: &Path, file: File) -> Result<(), PackFailure> {
    let failed = Arc::new(AtomicBool::new(false));
    let writer = TrackedWriter {
        inner: BufWriter::new(file),
        failed: Arc::clone(&failed),
    };
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(true);
    if let Err(err) = builder.append_dir_all(".", source) {
        return Err(if failed.load(Ordering::Relaxed) {
            PackFailure::Destination(err)
        } else {
            PackFailure::Snapshot(err)
        });
    }
    let writer = builder.into_inner().map_err(PackFailure::Destination)?;
    let file = writer
        .inner
        .into_inner()
        .map_err(|err| PackFailure::Destination(err.into_error()))?;
    file.sync_all().map_err(PackFailure::Destination)
}
