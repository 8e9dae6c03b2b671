use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::Context as _;
use archive_core::config::LogConfig;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

const LOG_FILE: &str = "archive-repo.log";
const ROTATION_PERIOD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Console output follows `RUST_LOG`; the log file follows the configured level.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let level: LevelFilter = config
        .level
        .parse()
        .with_context(|| format!("parse log level {:?}", config.level))?;
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("create log dir {}", config.dir.display()))?;
    rotate_log_files(&config.dir, config.retention, SystemTime::now())?;
    let file_layer = FileLogLayer::open(&config.dir.join(LOG_FILE))?;

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(console_filter))
        .with(file_layer.with_filter(level))
        .init();
    Ok(())
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: Level,
    pub target: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    pub fn format_line(&self) -> String {
        let message = self
            .fields
            .iter()
            .find(|(name, _)| name == "message")
            .map(|(_, value)| value.as_str())
            .unwrap_or("");
        let mut extras: Vec<String> = self
            .fields
            .iter()
            .filter(|(name, _)| name != "message")
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        extras.sort();
        let line = format!(
            "{} {:<5} {} {}",
            self.timestamp, self.level, self.target, message
        );
        if extras.is_empty() {
            line
        } else {
            format!("{line} | {}", extras.join(" "))
        }
    }
}

#[derive(Clone)]
pub struct FileLogLayer {
    file: Arc<Mutex<File>>,
}

impl FileLogLayer {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    fn write(&self, entry: &LogEntry) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", entry.format_line());
        }
    }
}

impl<S> Layer<S> for FileLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LogVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        let entry = LogEntry {
            timestamp: format_timestamp(OffsetDateTime::now_utc()),
            level: *metadata.level(),
            target: metadata.target().to_string(),
            fields: visitor.fields,
        };
        self.write(&entry);
    }
}

#[derive(Default)]
struct LogVisitor {
    fields: Vec<(String, String)>,
}

impl LogVisitor {
    fn push(&mut self, field: &tracing::field::Field, value: String) {
        self.fields.push((field.name().to_string(), value));
    }
}

impl tracing::field::Visit for LogVisitor {
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        self.push(field, format!("{value:?}"));
    }
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.unix_timestamp().to_string())
}

/// Starts a new log file once a week, keeping `retention` older files as
/// `archive-repo.log.1` (newest) up to `archive-repo.log.<retention>`.
pub fn rotate_log_files(dir: &Path, retention: usize, now: SystemTime) -> anyhow::Result<()> {
    let active = dir.join(LOG_FILE);
    let modified = match fs::metadata(&active).and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err).context("read log file metadata"),
    };
    let age = now.duration_since(modified).unwrap_or_default();
    if age < ROTATION_PERIOD {
        return Ok(());
    }

    if retention == 0 {
        fs::remove_file(&active).context("remove expired log file")?;
        return Ok(());
    }
    remove_if_exists(&rotated_path(dir, retention))?;
    for index in (1..retention).rev() {
        let from = rotated_path(dir, index);
        if from.exists() {
            fs::rename(&from, rotated_path(dir, index + 1))
                .with_context(|| format!("shift log file {}", from.display()))?;
        }
    }
    fs::rename(&active, rotated_path(dir, 1)).context("rotate active log file")?;
    Ok(())
}

fn rotated_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{LOG_FILE}.{index}"))
}

fn remove_if_exists(path: &Path) -> anyhow::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove log file {}", path.display())),
    }
}
