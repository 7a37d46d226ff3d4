//! Time series data handling for forecasting
//!
//! The ingestion layer (file parsing, date coercion, gap filling) lives outside
//! this crate. It hands over a [`Dataset`]: one dense, chronologically ordered
//! [`TimeSeries`] per commodity.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Months, Utc};
use price_math::stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum number of observations before any fit or search is attempted
pub const MIN_OBSERVATIONS: usize = 30;

/// Sampling frequency of a series, inferred from its timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// One observation per day
    Daily,
    /// One observation per week
    Weekly,
    /// One observation per calendar month
    Monthly,
    /// Any other regular spacing, in seconds
    Fixed(i64),
}

impl Frequency {
    /// Infer the frequency from the median spacing of consecutive timestamps
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Result<Self> {
        if timestamps.len() < 2 {
            return Err(ForecastError::InsufficientData(
                "At least 2 timestamps are needed to infer a frequency".to_string(),
            ));
        }

        let mut gaps: Vec<i64> = timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds())
            .collect();
        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2];

        const DAY: i64 = 86_400;
        Ok(match median {
            DAY => Frequency::Daily,
            s if s == 7 * DAY => Frequency::Weekly,
            s if (28 * DAY..=31 * DAY).contains(&s) => Frequency::Monthly,
            s if s > 0 => Frequency::Fixed(s),
            _ => {
                return Err(ForecastError::InvalidParameter(
                    "Timestamps must be strictly increasing".to_string(),
                ))
            }
        })
    }

    /// Advance a timestamp by `steps` periods
    pub fn advance(&self, from: DateTime<Utc>, steps: u32) -> Result<DateTime<Utc>> {
        let advanced = match self {
            Frequency::Daily => from.checked_add_signed(Duration::days(steps as i64)),
            Frequency::Weekly => from.checked_add_signed(Duration::weeks(steps as i64)),
            Frequency::Monthly => from.checked_add_months(Months::new(steps)),
            Frequency::Fixed(seconds) => {
                from.checked_add_signed(Duration::seconds(seconds * steps as i64))
            }
        };

        advanced.ok_or_else(|| {
            ForecastError::ForecastingError(format!(
                "Timestamp overflow advancing {} by {} steps",
                from, steps
            ))
        })
    }
}

/// Time series for a single commodity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Observation timestamps, strictly increasing
    timestamps: Vec<DateTime<Utc>>,
    /// Observed prices
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a new series from timestamps and values
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Timestamps length ({}) doesn't match values length ({})",
                timestamps.len(),
                values.len()
            )));
        }

        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ForecastError::InvalidParameter(format!(
                "Timestamps must be strictly increasing (position {})",
                pos + 1
            )));
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Value at position {} is not finite",
                pos
            )));
        }

        Ok(Self { timestamps, values })
    }

    /// Build a regularly spaced series starting at `start`
    pub fn regular(start: DateTime<Utc>, frequency: Frequency, values: Vec<f64>) -> Result<Self> {
        let timestamps = (0..values.len())
            .map(|i| frequency.advance(start, i as u32))
            .collect::<Result<Vec<_>>>()?;
        Self::new(timestamps, values)
    }

    /// Get the observed values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get the length of the time series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the time series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last observed timestamp
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Infer the sampling frequency
    pub fn frequency(&self) -> Result<Frequency> {
        Frequency::infer(&self.timestamps)
    }

    /// Get a slice of the data from start to end index
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Invalid slice {}..{} for series of length {}",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        })
    }

    /// Split chronologically at `index`: `[0, index)` and `[index, len)`
    pub fn split_at(&self, index: usize) -> Result<(Self, Self)> {
        Ok((self.slice(0, index)?, self.slice(index, self.len())?))
    }

    /// Generate `horizon` timestamps after the last observation
    pub fn future_timestamps(&self, horizon: usize) -> Result<Vec<DateTime<Utc>>> {
        let last = self.last_timestamp().ok_or_else(|| {
            ForecastError::InsufficientData("Empty series has no last timestamp".to_string())
        })?;
        let frequency = self.frequency()?;

        (1..=horizon)
            .map(|step| frequency.advance(last, step as u32))
            .collect()
    }

    /// Summary statistics of the values
    pub fn summary(&self) -> Option<SeriesSummary> {
        describe(&self.values, self.len())
    }

    /// Reject series that cannot be modelled: too short or without variance
    pub fn ensure_modelable(&self, min_observations: usize) -> Result<()> {
        if self.len() < min_observations {
            return Err(ForecastError::InsufficientData(format!(
                "Need at least {} observations, have {}",
                min_observations,
                self.len()
            )));
        }

        let summary = self.summary().ok_or_else(|| {
            ForecastError::InsufficientData("Series is empty".to_string())
        })?;
        if summary.std_dev <= f64::EPSILON * summary.mean.abs().max(1.0) {
            return Err(ForecastError::InsufficientData(
                "Series has zero variance".to_string(),
            ));
        }

        Ok(())
    }
}

/// Descriptive statistics of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub length: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
}

/// Statistics over `values`, reported with `length` observations.
///
/// A single value has a standard deviation of zero.
fn describe(values: &[f64], length: usize) -> Option<SeriesSummary> {
    let mean = stats::mean(values).ok()?;
    let std_dev = stats::std_dev(values, 1).unwrap_or(0.0);

    Some(SeriesSummary {
        length,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        std_dev,
    })
}

/// Pre-modelling validation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesValidation {
    /// Whether the series can be modelled
    pub valid: bool,
    /// Human readable problems found
    pub warnings: Vec<String>,
    /// Summary statistics, absent for an empty series
    pub info: Option<SeriesSummary>,
}

/// Validate a raw column before modelling.
///
/// `None` entries are missing observations as delivered by the ingestion
/// layer. More than 10% missing yields a warning; fewer than
/// `min_length` present values or zero variance make the series invalid.
pub fn validate_series(values: &[Option<f64>], min_length: usize) -> SeriesValidation {
    let mut warnings = Vec::new();
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let mut valid = true;
    if values.len() < min_length {
        valid = false;
        warnings.push(format!(
            "Too few observations: at least {} data points are required",
            min_length
        ));
    }

    if !values.is_empty() {
        let missing_pct = (values.len() - present.len()) as f64 / values.len() as f64 * 100.0;
        if missing_pct > 10.0 {
            warnings.push(format!("Series has {:.1}% missing values", missing_pct));
        }
    }

    let info = describe(&present, values.len());

    if info.map_or(true, |s| s.std_dev == 0.0) {
        valid = false;
        warnings.push("Series has no variation (variance = 0)".to_string());
    }

    SeriesValidation {
        valid,
        warnings,
        info,
    }
}

/// Cleaned price data for all commodities, keyed by commodity name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    series: BTreeMap<String, TimeSeries>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the series of a commodity
    pub fn insert(&mut self, commodity: impl Into<String>, series: TimeSeries) {
        self.series.insert(commodity.into(), series);
    }

    /// Get the series of a commodity
    pub fn get(&self, commodity: &str) -> Option<&TimeSeries> {
        self.series.get(commodity)
    }

    /// Commodity names present in the dataset
    pub fn commodities(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    /// Number of commodities
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if the dataset has no commodities
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<(String, TimeSeries)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (String, TimeSeries)>>(iter: I) -> Self {
        Self {
            series: iter.into_iter().collect(),
        }
    }
}
