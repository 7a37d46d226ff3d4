//! # Price Math
//!
//! Numeric building blocks for the commodity price forecasting pipeline.
//! This crate provides descriptive statistics, differencing and lag-polynomial
//! algebra, a derivative-free optimiser and unit-root style stationarity checks.

use thiserror::Error;

pub mod differencing;
pub mod optimizer;
pub mod polynomial;
pub mod stationarity;
pub mod stats;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
