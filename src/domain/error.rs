//! Domain error types.

/// Top-level error type for fractaltrader.
#[derive(Debug, thiserror::Error)]
pub enum FractalTraderError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("bars out of order at index {index}: timestamps must be strictly increasing")]
    UnorderedBars { index: usize },

    #[error("position series has {positions} values for {bars} bars")]
    LengthMismatch { bars: usize, positions: usize },

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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("serialization error: {reason}")]
    Serialize { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FractalTraderError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        FractalTraderError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&FractalTraderError> for std::process::ExitCode {
    fn from(err: &FractalTraderError) -> Self {
        let code: u8 = match err {
            FractalTraderError::Io(_) => 1,
            FractalTraderError::InvalidParameter { .. }
            | FractalTraderError::ConfigParse { .. }
            | FractalTraderError::ConfigMissing { .. }
            | FractalTraderError::ConfigInvalid { .. } => 2,
            FractalTraderError::InsufficientData { .. }
            | FractalTraderError::UnorderedBars { .. }
            | FractalTraderError::LengthMismatch { .. }
            | FractalTraderError::Data { .. } => 3,
            FractalTraderError::Serialize { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
