//! Domain error types.

/// Top-level error type for barflow.
#[derive(Debug, thiserror::Error)]
pub enum BarflowError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to load data from {source_name}: {reason}")]
    DataLoad { source_name: String, reason: String },

    #[error("symbol {symbol} is not tracked by the data handler")]
    UnknownSymbol { symbol: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("protocol error: {reason}")]
    Protocol { reason: String },

    #[error("data server replied with error: {message}")]
    Remote { message: String },

    #[error("failed to initialise logging: {reason}")]
    Logging { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BarflowError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        BarflowError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config_missing(section: &str, key: &str) -> Self {
        BarflowError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&BarflowError> for std::process::ExitCode {
    fn from(err: &BarflowError) -> Self {
        let code: u8 = match err {
            BarflowError::Io(_) => 1,
            BarflowError::ConfigParse { .. }
            | BarflowError::ConfigMissing { .. }
            | BarflowError::ConfigInvalid { .. } => 2,
            BarflowError::DataLoad { .. }
            | BarflowError::UnknownSymbol { .. }
            | BarflowError::NoData { .. } => 3,
            BarflowError::Protocol { .. } | BarflowError::Remote { .. } => 4,
            BarflowError::Logging { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
