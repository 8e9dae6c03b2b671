use crate::logging;
use anyhow::Context;
use archive_core::archive::SnapshotArchiver;
use archive_core::batch::ConcurrentBatchRunner;
use archive_core::config::{AppConfig, default_config_path};
use archive_core::model::QueryMode;
use archive_core::orchestrator::Orchestrator;
use archive_core::paths::ArchiveLayout;
use archive_core::tarball::TarballProducer;
use archive_remote::{SmtpAlerter, SshDeletionQuery};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

mod app;
mod args;

use args::*;

pub async fn run() -> anyhow::Result<()> {
    app::run().await
}
