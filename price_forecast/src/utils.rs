//! Utility functions for the price_forecast crate

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};

/// Number of training observations for a chronological split:
/// `floor(n * (1 - test_fraction))`.
///
/// Both segments must be non-empty.
pub fn split_index(len: usize, test_fraction: f64) -> Result<usize> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Test fraction must lie strictly between 0 and 1, got {}",
            test_fraction
        )));
    }

    let train = (len as f64 * (1.0 - test_fraction)).floor() as usize;
    if train == 0 || train >= len {
        return Err(ForecastError::InsufficientData(format!(
            "Test fraction {} leaves an empty segment for {} observations",
            test_fraction, len
        )));
    }
    Ok(train)
}

/// Split time series data into training and test sets, preserving order
pub fn train_test_split(series: &TimeSeries, test_fraction: f64) -> Result<(TimeSeries, TimeSeries)> {
    series.split_at(split_index(series.len(), test_fraction)?)
}

/// Round a price to whole currency units
pub fn round_currency(value: f64) -> i64 {
    value.round() as i64
}
