//! Descriptive statistics used throughout the forecasting pipeline
//!
//! Contains:
//! - Mean, variance and standard deviation (population and sample)
//! - Median
//! - Normal distribution quantiles for confidence intervals
//! - Ordinary least squares trend removal

use crate::{MathError, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Arithmetic mean of a slice
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty slice".to_string(),
        ));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Variance with the given delta degrees of freedom (0 = population, 1 = sample)
pub fn variance(values: &[f64], ddof: usize) -> Result<f64> {
    if values.len() <= ddof {
        return Err(MathError::InsufficientData(format!(
            "Variance with ddof={} needs more than {} values, have {}",
            ddof,
            ddof,
            values.len()
        )));
    }

    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Ok(ss / (values.len() - ddof) as f64)
}

/// Standard deviation with the given delta degrees of freedom
pub fn std_dev(values: &[f64], ddof: usize) -> Result<f64> {
    variance(values, ddof).map(f64::sqrt)
}

/// Median of a slice of finite values
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the median of an empty slice".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Quantile of the standard normal distribution
pub fn normal_quantile(probability: f64) -> Result<f64> {
    if !(probability > 0.0 && probability < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Probability must lie strictly between 0 and 1, got {}",
            probability
        )));
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::CalculationError(format!("Standard normal: {}", e)))?;
    Ok(normal.inverse_cdf(probability))
}

/// Two-sided critical value for a confidence level, e.g. 1.96 for 0.95
pub fn two_sided_z(confidence: f64) -> Result<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Confidence level must lie strictly between 0 and 1, got {}",
            confidence
        )));
    }

    normal_quantile(1.0 - (1.0 - confidence) / 2.0)
}

/// Residuals of an OLS fit of `values` on a linear time index
pub fn detrend(values: &[f64]) -> Result<Vec<f64>> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(
            "Detrending needs at least 2 values".to_string(),
        ));
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values)?;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64 - x_mean;
        numerator += x * (y - y_mean);
        denominator += x * x;
    }

    let slope = numerator / denominator;
    let intercept = y_mean - slope * x_mean;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &y)| y - (intercept + slope * i as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(variance(&values, 0).unwrap(), 4.0);
        assert_relative_eq!(std_dev(&values, 0).unwrap(), 2.0);
        assert_relative_eq!(variance(&values, 1).unwrap(), 32.0 / 7.0);
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        assert!(mean(&[]).is_err());
        assert!(variance(&[1.0], 1).is_err());
        assert!(median(&[]).is_err());
    }

    #[test]
    fn test_median() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_normal_quantiles() {
        assert_relative_eq!(normal_quantile(0.5).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(two_sided_z(0.95).unwrap(), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(two_sided_z(0.80).unwrap(), 1.281552, epsilon = 1e-5);
        assert!(two_sided_z(1.0).is_err());
        assert!(normal_quantile(0.0).is_err());
    }

    #[test]
    fn test_detrend_removes_line() {
        let values: Vec<f64> = (0..20).map(|i| 3.0 + 2.5 * i as f64).collect();
        let residuals = detrend(&values).unwrap();

        for r in residuals {
            assert!(r.abs() < 1e-9);
        }
    }
}
