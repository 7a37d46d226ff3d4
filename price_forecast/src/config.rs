//! Configuration of the forecasting core

use crate::data::MIN_OBSERVATIONS;
use crate::error::{ForecastError, Result};
use crate::evaluation::{ForecastOptions, DEFAULT_CONFIDENCE, DEFAULT_TEST_FRACTION};
use crate::models::FitOptions;
use crate::search::SearchSpace;
use crate::store::ParamStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings shared by every operation of a [`Session`](crate::session::Session).
///
/// Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Location of the parameter store file
    pub params_file: PathBuf,
    /// Minimum series length accepted before fitting or searching
    pub min_observations: usize,
    /// Share of the series held out by validation
    pub test_fraction: f64,
    /// Two-sided coverage of forecast bounds
    pub confidence: f64,
    /// Periods forecast when the caller does not say
    pub default_periods: usize,
    /// Refuse validation and forecasting with untuned specifications
    pub require_tuned: bool,
    pub fit: FitOptions,
    pub search: SearchSpace,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            params_file: PathBuf::from("models/best_params.json"),
            min_observations: MIN_OBSERVATIONS,
            test_fraction: DEFAULT_TEST_FRACTION,
            confidence: DEFAULT_CONFIDENCE,
            default_periods: 12,
            require_tuned: true,
            fit: FitOptions::default(),
            search: SearchSpace::default(),
        }
    }
}

impl ForecastConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| ForecastError::InvalidParameter(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no operation could run with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "test_fraction must lie strictly between 0 and 1, got {}",
                self.test_fraction
            )));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence must lie strictly between 0 and 1, got {}",
                self.confidence
            )));
        }
        if self.fit.optimizer.max_iter == 0 {
            return Err(ForecastError::InvalidParameter(
                "fit.optimizer.max_iter must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The parameter store this configuration points at
    pub fn store(&self) -> ParamStore {
        ParamStore::new(&self.params_file)
    }

    /// Forecast options with the configured defaults
    pub fn forecast_options(&self) -> ForecastOptions {
        ForecastOptions {
            periods: self.default_periods,
            full_data: true,
            confidence: self.confidence,
        }
    }
}
