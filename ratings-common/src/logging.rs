use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use anyhow::Context;
use tokio::task;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracing_subscriber::filter::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

/// Keeps the non-blocking file writer alive; drop it last.
pub struct LoggerGuard {
    _writer: WorkerGuard,
}

/// Initialise console + daily rolling file logging.
///
/// `level` is the default directive; `RUST_LOG` refines it. Must be called
/// from inside a tokio runtime (old log files are pruned by a background task).
pub fn init_logging(
    log_dir: impl AsRef<Path>,
    prefix: &str,
    level: &str,
) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let default_level = parse_level(level).unwrap_or_else(|| {
        // The subscriber is not installed yet.
        eprintln!("Invalid log level '{}', defaulting to 'info'", level);
        LevelFilter::INFO
    });
    let env_directives = std::env::var("RUST_LOG").unwrap_or_default();
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .parse_lossy(&env_directives)
    };

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| format!("Failed to create file appender in {:?}", log_dir))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter());
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    start_log_cleanup_task(log_dir, prefix.to_string());

    Ok(LoggerGuard { _writer: guard })
}

/// Config level name to a filter; `None` for anything but trace/debug/info/warn/error.
fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

fn start_log_cleanup_task(log_dir: PathBuf, prefix: String) {
    const MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);
    const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

    task::spawn(async move {
        loop {
            if let Err(e) = cleanup_old_logs(&log_dir, &prefix, MAX_AGE) {
                tracing::warn!("Failed to delete old log file: {}", e);
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

/// Delete `<prefix>*.log` files in `log_dir` older than `max_age`. Returns how many were removed.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.starts_with(prefix) && file_name.ends_with(".log") {
                let metadata = fs::metadata(&path)?;
                if let Ok(modified) = metadata.modified() {
                    if now.duration_since(modified).unwrap_or_default() > max_age {
                        fs::remove_file(&path)?;
                        removed += 1;
                        tracing::info!("Old log file deleted: {}", file_name);
                    }
                }
            }
        }
    }
    Ok(removed)
}
