use super::*;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = AppConfig::load(&config_path)?;
    config.validate().context("validate config")?;
    logging::init(&config.log).context("initialize logging")?;

    let mode: QueryMode = cli.repo.into();
    info!(mode = %mode, config = %config_path.display(), "Starting archive run");

    let orchestrator = build_orchestrator(&config);
    match orchestrator.run(mode).await {
        Ok(summary) => {
            println!(
                "Processed {} batches totaling {} repos",
                summary.batches, summary.repos
            );
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "Archive run failed");
            Err(err).context("archive deleted repositories")
        }
    }
}

fn build_orchestrator(config: &AppConfig) -> Orchestrator {
    let alerter = Arc::new(SmtpAlerter::from_config(&config.email));
    let tarballer = Arc::new(TarballProducer::new(
        alerter,
        config.email.recipients.clone(),
        config.email.sender.clone(),
    ));
    let archiver = Arc::new(SnapshotArchiver::new(
        ArchiveLayout::from_config(config),
        tarballer,
    ));
    let runner = Arc::new(ConcurrentBatchRunner::new(archiver));
    let query = Arc::new(SshDeletionQuery::new(
        config.platform.clone(),
        &config.ssh_private_key,
    ));
    Orchestrator::new(query, runner, config.batch_size)
}
