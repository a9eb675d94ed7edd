//! Domain error types.

/// Top-level error type for tradebench.
#[derive(Debug, thiserror::Error)]
pub enum TradebenchError {
    #[error("insufficient data for {indicator}: have {have} bars, need {need}")]
    InsufficientData {
        indicator: String,
        have: usize,
        need: usize,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("simulation invariant violated: {reason}")]
    SimulationInvariant { reason: String },

    #[error("invalid candle series at index {index}: {reason}")]
    InvalidSeries { index: usize, reason: String },

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

    #[error("market data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradebenchError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TradebenchError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        TradebenchError::SimulationInvariant {
            reason: reason.into(),
        }
    }
}

impl TradebenchError {
    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            TradebenchError::Io(_) => 1,
            TradebenchError::ConfigParse { .. }
            | TradebenchError::ConfigMissing { .. }
            | TradebenchError::ConfigInvalid { .. } => 2,
            TradebenchError::InvalidParameter { .. } => 3,
            TradebenchError::Data { .. }
            | TradebenchError::InvalidSeries { .. }
            | TradebenchError::InsufficientData { .. } => 4,
            TradebenchError::SimulationInvariant { .. } => 5,
            TradebenchError::Report { .. } => 6,
        }
    }
}

impl From<&TradebenchError> for std::process::ExitCode {
    fn from(err: &TradebenchError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
