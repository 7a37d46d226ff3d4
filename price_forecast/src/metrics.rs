//! Metrics for evaluating forecast performance
//!
//! Each metric is computed on its own. A metric that is undefined for the
//! given input fails alone and shows up as `None` in [`ForecastMetrics`].

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{Forecast, ForecastModel, TrainedForecastModel};
use serde::{Deserialize, Serialize};
use std::fmt;

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::InvalidParameter(format!(
            "Actual and predicted values must have the same non-zero length ({} vs {})",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ForecastError::InvalidParameter(format!(
            "{} is not finite",
            name
        )))
    }
}

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    finite("MAE", sum / actual.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    finite("RMSE", (sum / actual.len() as f64).sqrt())
}

/// Mean absolute percentage error, in percent.
///
/// Points whose actual value is zero are skipped. If every actual value is
/// zero the metric is undefined and a [`ForecastError::DivisionError`] is
/// returned.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;

    let (sum, count) = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });

    if count == 0 {
        return Err(ForecastError::DivisionError(
            "MAPE is undefined when every actual value is zero".to_string(),
        ));
    }

    finite("MAPE", sum / count as f64 * 100.0)
}

/// Forecast performance metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: Option<f64>,
    /// Root Mean Squared Error
    pub rmse: Option<f64>,
    /// Mean Absolute Percentage Error
    pub mape: Option<f64>,
}

impl ForecastMetrics {
    /// Compute every metric independently; failures become `None`
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        Self {
            mae: mean_absolute_error(actual, predicted).ok(),
            rmse: root_mean_squared_error(actual, predicted).ok(),
            mape: mean_absolute_percentage_error(actual, predicted).ok(),
        }
    }

    /// Advisory accuracy band derived from MAPE
    pub fn accuracy_band(&self) -> Option<AccuracyBand> {
        self.mape.map(AccuracyBand::from_mape)
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn cell(value: Option<f64>, suffix: &str) -> String {
            value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}{}", v, suffix))
        }

        writeln!(f, "Forecast Performance Metrics:")?;
        writeln!(f, "  MAE:     {}", cell(self.mae, ""))?;
        writeln!(f, "  RMSE:    {}", cell(self.rmse, ""))?;
        writeln!(f, "  MAPE:    {}", cell(self.mape, "%"))?;
        if let Some(band) = self.accuracy_band() {
            writeln!(f, "  Band:    {}", band)?;
        }
        Ok(())
    }
}

/// Informational interpretation of a MAPE value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyBand {
    /// MAPE below 5%
    VeryGood,
    /// MAPE from 5% to 10%
    Good,
    /// MAPE from 10% to 20%
    Fair,
    /// MAPE above 20%
    Poor,
}

impl AccuracyBand {
    pub fn from_mape(mape: f64) -> Self {
        if mape < 5.0 {
            AccuracyBand::VeryGood
        } else if mape < 10.0 {
            AccuracyBand::Good
        } else if mape <= 20.0 {
            AccuracyBand::Fair
        } else {
            AccuracyBand::Poor
        }
    }
}

impl fmt::Display for AccuracyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccuracyBand::VeryGood => "very good",
            AccuracyBand::Good => "good",
            AccuracyBand::Fair => "fair",
            AccuracyBand::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// Train `model` on `train`, forecast one step per test observation and score
/// the point forecasts against the test values
pub fn evaluate_model<M: ForecastModel>(
    model: &M,
    train: &TimeSeries,
    test: &TimeSeries,
    confidence: f64,
) -> Result<(Forecast, ForecastMetrics)> {
    let trained = model.train(train)?;
    let forecast = trained.forecast(test.len(), confidence)?;
    let metrics = ForecastMetrics::compute(test.values(), &forecast.values());
    Ok((forecast, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_metrics() {
        let actual = [100.0, 200.0, 300.0];
        let predicted = [110.0, 190.0, 330.0];

        assert_relative_eq!(mean_absolute_error(&actual, &predicted).unwrap(), 50.0 / 3.0);
        assert_relative_eq!(
            root_mean_squared_error(&actual, &predicted).unwrap(),
            (1100.0f64 / 3.0).sqrt()
        );
        assert_relative_eq!(
            mean_absolute_percentage_error(&actual, &predicted).unwrap(),
            (0.1 + 0.05 + 0.1) / 3.0 * 100.0
        );
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        let mape = mean_absolute_percentage_error(&[0.0, 100.0], &[5.0, 90.0]).unwrap();
        assert_relative_eq!(mape, 10.0);
    }

    #[test]
    fn test_mape_all_zero_is_division_error() {
        let err = mean_absolute_percentage_error(&[0.0, 0.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ForecastError::DivisionError(_)));
    }

    #[test]
    fn test_compute_degrades_single_metric() {
        let metrics = ForecastMetrics::compute(&[0.0, 0.0], &[1.0, 3.0]);
        assert_relative_eq!(metrics.mae.unwrap(), 2.0);
        assert!(metrics.rmse.is_some());
        assert!(metrics.mape.is_none());
    }

    #[test]
    fn test_compute_mismatched_lengths() {
        let metrics = ForecastMetrics::compute(&[1.0, 2.0], &[1.0]);
        assert_eq!(
            metrics,
            ForecastMetrics {
                mae: None,
                rmse: None,
                mape: None
            }
        );
    }

    #[test]
    fn test_non_finite_is_failure() {
        assert!(mean_absolute_error(&[1.0], &[f64::NAN]).is_err());
    }

    #[test]
    fn test_accuracy_bands() {
        assert_eq!(AccuracyBand::from_mape(2.0), AccuracyBand::VeryGood);
        assert_eq!(AccuracyBand::from_mape(5.0), AccuracyBand::Good);
        assert_eq!(AccuracyBand::from_mape(15.0), AccuracyBand::Fair);
        assert_eq!(AccuracyBand::from_mape(20.5), AccuracyBand::Poor);
    }
}
