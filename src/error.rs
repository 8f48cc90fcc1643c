use thiserror::Error;

/// Errors raised by the forecasting core and its loaders
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Rejected before any forecasting work starts
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Scoped to one region; the engine records it and keeps going
    #[error("insufficient history for region '{region}': {reason}")]
    InsufficientHistory { region: String, reason: String },

    /// Feature vector does not line up with what the model was trained on
    #[error("feature contract mismatch: {0}")]
    FeatureContractMismatch(String),

    #[error("predictor unavailable: {0}")]
    PredictorUnavailable(String),

    #[error("invalid series for region '{region}': {reason}")]
    InvalidSeries { region: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForecastError {
    pub fn insufficient_history(region: &str, reason: impl Into<String>) -> Self {
        ForecastError::InsufficientHistory {
            region: region.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors that abort a whole forecast run rather than a single region
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ForecastError::InsufficientHistory { .. })
    }
}

impl From<config::ConfigError> for ForecastError {
    fn from(err: config::ConfigError) -> Self {
        ForecastError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
