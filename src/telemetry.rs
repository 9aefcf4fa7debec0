//! Structured logging setup.

use crate::domain::error::BarflowError;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Also append plain-text logs here.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
        }
    }
}

static INSTALLED: Mutex<bool> = Mutex::new(false);

/// Install the global subscriber. Later calls in the same process still open
/// the log file but leave the installed subscriber alone.
pub fn init_logging(config: &LoggingConfig) -> Result<(), BarflowError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| BarflowError::Logging {
                    reason: format!("cannot open {}: {}", path.display(), e),
                })?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    let mut installed = INSTALLED.lock().map_err(|_| BarflowError::Logging {
        reason: "logging setup lock poisoned".into(),
    })?;
    if *installed {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| BarflowError::Logging {
            reason: e.to_string(),
        })?;
    *installed = true;
    Ok(())
}
