//! Error types for the price_forecast crate

use price_math::MathError;
use thiserror::Error;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Series too short or without variance
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The estimator could not produce a finite estimate
    #[error("Fit error: {0}")]
    FitError(String),

    /// Invalid horizon, confidence level or model state
    #[error("Forecast error: {0}")]
    ForecastingError(String),

    /// Parameter store file or commodity key is missing
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// Parameter store content is malformed
    #[error("Store parse error: {0}")]
    StoreParse(String),

    /// Written parameters could not be read back as written
    #[error("Store verification failed: {0}")]
    StoreVerification(String),

    /// No candidate converged in any search branch
    #[error("Search exhausted: {0}")]
    SearchExhausted(String),

    /// A metric is undefined for the given input (e.g. MAPE on all-zero actuals)
    #[error("Division error: {0}")]
    DivisionError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from numeric kernels
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV export
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InsufficientData(_) => "InsufficientDataError",
            ForecastError::FitError(_) => "FitError",
            ForecastError::ForecastingError(_) => "ForecastError",
            ForecastError::StoreNotFound(_) => "StoreNotFoundError",
            ForecastError::StoreParse(_) => "StoreParseError",
            ForecastError::StoreVerification(_) => "StoreVerificationError",
            ForecastError::SearchExhausted(_) => "SearchExhaustedError",
            ForecastError::DivisionError(_) => "DivisionError",
            ForecastError::InvalidParameter(_) => "InvalidParameterError",
            ForecastError::MathError(_) => "MathError",
            ForecastError::IoError(_) => "IoError",
            ForecastError::CsvError(_) => "CsvError",
        }
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::StoreParse(err.to_string())
    }
}
