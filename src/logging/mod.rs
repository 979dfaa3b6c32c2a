//! Process-wide `tracing` setup for a training run.
//!
//! `init_logger` installs one subscriber: a plain-text file layer written
//! through a non-blocking appender, plus an optional stdout mirror. A second
//! call in the same process fails with `TrainError::Logger`.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{Result, TrainError};

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerOptions {
    pub log_file: PathBuf,
    /// DEBUG level instead of INFO.
    pub debug: bool,
    /// Mirror every event to stdout.
    pub stdout: bool,
}

impl LoggerOptions {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        LoggerOptions { log_file: log_file.into(), debug: false, stdout: true }
    }

    fn level(&self) -> LevelFilter {
        if self.debug { LevelFilter::DEBUG } else { LevelFilter::INFO }
    }
}

/// Keeps the background log writer alive. Dropping it flushes pending lines.
#[must_use = "dropping the guard stops the log writer"]
pub struct LoggerGuard {
    _worker: WorkerGuard,
    log_file: PathBuf,
}

impl LoggerGuard {
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Rejects paths that can never be a log file. Runs before anything is
/// created on disk.
pub fn validate_log_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(TrainError::logger("log file path is empty"));
    }
    if path.is_dir() {
        return Err(TrainError::logger(format!(
            "log file path {} is a directory",
            path.display()
        )));
    }
    if path.file_name().is_none() {
        return Err(TrainError::logger(format!(
            "log file path {} has no file name",
            path.display()
        )));
    }
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG`, when set, overrides the level.
pub fn init_logger(options: &LoggerOptions) -> Result<LoggerGuard> {
    validate_log_path(&options.log_file)?;

    let file_name = options
        .log_file
        .file_name()
        .ok_or_else(|| TrainError::logger("log file path has no file name"))?;
    let dir = match options.log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| TrainError::io(&dir, e))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = || {
        EnvFilter::builder()
            .with_default_directive(options.level().into())
            .from_env_lossy()
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_filter(filter());

    let stdout_layer = options.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter())
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| TrainError::logger(format!("logger already initialised: {e}")))?;

    Ok(LoggerGuard { _worker: guard, log_file: options.log_file.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_path() {
        assert!(matches!(validate_log_path(Path::new("")), Err(TrainError::Logger(_))));
    }

    #[test]
    fn test_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(validate_log_path(dir.path()), Err(TrainError::Logger(_))));
        // Nothing was created next to it either.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_accepts_new_file_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_log_path(&dir.path().join("log.txt")).is_ok());
    }

    #[test]
    fn test_level_follows_debug_flag() {
        let mut opts = LoggerOptions::new("log.txt");
        assert_eq!(opts.level(), LevelFilter::INFO);
        opts.debug = true;
        assert_eq!(opts.level(), LevelFilter::DEBUG);
    }
}
