use std::io::Write;
use std::path::Path;

use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log level `{0}`: {1}")]
    InvalidLevel(String, String),

    #[error("cannot open log output {0}: {1}")]
    Output(String, std::io::Error),

    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Installs the global tracing subscriber described by `config`.
/// `RUST_LOG`, when set, replaces the configured level.
///
/// Lines are written by a background worker; keep the returned guard alive
/// until shutdown so buffered lines get flushed.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::InvalidLevel(config.level.clone(), e.to_string()))?,
    };

    let (writer, guard) = match config.output.as_str() {
        "stdout" => tracing_appender::non_blocking(std::io::stdout()),
        "stderr" => tracing_appender::non_blocking(std::io::stderr()),
        path => tracing_appender::non_blocking(rotating_file(Path::new(path), config)?),
    };
    install(filter, config.format, writer, config.output.as_str() != "stdout")?;
    Ok(guard)
}

/// Size-capped log file. Once a file passes `max_size_mb` it is renamed to
/// `<path>.1` and older backups shift up, keeping at most `max_files`.
pub fn rotating_file(
    path: &Path,
    config: &LoggingConfig,
) -> Result<impl Write + Send + 'static, LoggingError> {
    let display = path.to_string_lossy().into_owned();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LoggingError::Output(display.clone(), e))?;
    }
    // Surface an unwritable location at startup, not on the first log line.
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggingError::Output(display, e))?;

    let max_bytes = usize::try_from(config.max_size_mb.saturating_mul(1024 * 1024))
        .unwrap_or(usize::MAX);
    Ok(FileRotate::new(
        path,
        AppendCount::new(config.max_files),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

fn install(
    filter: EnvFilter,
    format: LogFormat,
    writer: NonBlocking,
    plain: bool,
) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!plain)
        .with_writer(writer);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| LoggingError::Install(e.to_string()))
}
