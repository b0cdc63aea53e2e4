//! Domain error types.

/// Top-level error type for adaptrader.
#[derive(Debug, thiserror::Error)]
pub enum AdaptraderError {
    #[error("invalid input at bar {index}: {reason}")]
    InvalidInput { index: usize, reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("invalid trade record for {symbol}: {reason}")]
    InvalidTrade { symbol: String, reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("external signal unavailable: {reason}")]
    ExternalSignal { reason: String },

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

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AdaptraderError> for std::process::ExitCode {
    fn from(err: &AdaptraderError) -> Self {
        let code: u8 = match err {
            AdaptraderError::Io(_) => 1,
            AdaptraderError::ConfigParse { .. }
            | AdaptraderError::ConfigMissing { .. }
            | AdaptraderError::ConfigInvalid { .. } => 2,
            AdaptraderError::DataSource { .. } | AdaptraderError::Csv(_) => 3,
            AdaptraderError::InvalidInput { .. } | AdaptraderError::InvalidTrade { .. } => 4,
            AdaptraderError::InsufficientData { .. } => 5,
            AdaptraderError::ExternalSignal { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
