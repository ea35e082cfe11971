use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "APOD_TUI_LOG";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to init logger: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// `APOD_TUI_LOG` wins over the configured level.
pub fn filter_directive(configured: &str) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| configured.trim().to_string())
}

/// Install a file-backed subscriber. The terminal belongs to the UI, so
/// nothing is written to stdout/stderr; with no file configured logging is
/// off.
pub fn init(level: &str, file: Option<&Path>) -> Result<(), LoggingError> {
    let Some(path) = file else {
        return Ok(());
    };
    let env_filter = EnvFilter::from_str(&filter_directive(level))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })?;
    }
    let writer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_path_buf(),
            source,
        })?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(writer)),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_is_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("apod.log");
        let err = init("apod_tui=notalevel", Some(&path));
        if std::env::var(LOG_ENV).is_err() {
            assert!(matches!(err, Err(LoggingError::InvalidFilter(_))));
            assert!(!path.exists());
        }
    }

    #[test]
    fn no_file_means_no_subscriber() {
        assert!(init("info", None).is_ok());
    }
}
