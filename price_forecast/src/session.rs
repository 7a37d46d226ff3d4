//! Application state across calls
//!
//! A [`Session`] holds the current dataset, the fitted models reused by
//! repeated forecasts and the last validation and forecast per commodity.
//!
//! Lifecycle:
//! - `load_dataset` replaces the dataset, resets tuning of every commodity in
//!   the store and clears every cached result;
//! - `tune` commits new orders and drops the cached results of that commodity;
//! - `validate` and `forecast` record their result on success.

use crate::config::ForecastConfig;
use crate::data::{validate_series, Dataset, SeriesValidation, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate_with, forecast_from, EvaluationResult, ForecastOptions, ForecastResult};
use crate::models::{ModelState, Sarima};
use crate::search::{OrderSearch, TuningOutcome};
use crate::store::{CommodityModelSpec, ParamStore};
use crate::utils::split_index;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Orchestration state for one user of the forecasting core
#[derive(Debug)]
pub struct Session {
    config: ForecastConfig,
    store: ParamStore,
    dataset: Option<Dataset>,
    /// Fitted models keyed by commodity, with the spec and sample they were
    /// fitted for
    models: BTreeMap<String, CachedModel>,
    last_evaluation: BTreeMap<String, EvaluationResult>,
    last_forecast: BTreeMap<String, ForecastResult>,
}

#[derive(Debug)]
struct CachedModel {
    spec: CommodityModelSpec,
    full_data: bool,
    state: ModelState,
}

impl Session {
    pub fn new(config: ForecastConfig) -> Self {
        let store = config.store();
        Self {
            config,
            store,
            dataset: None,
            models: BTreeMap::new(),
            last_evaluation: BTreeMap::new(),
            last_forecast: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn store(&self) -> &ParamStore {
        &self.store
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Replace the dataset; every stored tuning becomes stale.
    ///
    /// Returns how many commodities had been tuned. A missing store is not an
    /// error here, there is simply nothing to reset.
    pub fn load_dataset(&mut self, dataset: Dataset) -> Result<usize> {
        let reset = if self.store.exists() {
            self.store.reset_all()?
        } else {
            warn!(path = %self.store.path().display(), "no parameter store to reset");
            0
        };

        self.models.clear();
        self.last_evaluation.clear();
        self.last_forecast.clear();
        info!(commodities = dataset.len(), reset, "dataset loaded");
        self.dataset = Some(dataset);
        Ok(reset)
    }

    /// Pre-modelling checks on a commodity's series
    pub fn validate_series(&self, commodity: &str) -> Result<SeriesValidation> {
        let series = lookup(&self.dataset, commodity)?;
        let values: Vec<Option<f64>> = series.values().iter().copied().map(Some).collect();
        Ok(validate_series(&values, self.config.min_observations))
    }

    /// Search the best orders for a commodity and commit them to the store
    pub fn tune(&mut self, commodity: &str) -> Result<TuningOutcome> {
        let series = lookup(&self.dataset, commodity)?;
        let outcome = OrderSearch::new(self.config.search)
            .with_fit_options(self.config.fit)
            .with_min_observations(self.config.min_observations)
            .tune(series, commodity, &self.store)?;

        self.models.remove(commodity);
        self.last_evaluation.remove(commodity);
        self.last_forecast.remove(commodity);
        Ok(outcome)
    }

    /// Hold-out validation of the stored specification
    pub fn validate(&mut self, commodity: &str) -> Result<&EvaluationResult> {
        let spec = self.tuned_spec(commodity)?;
        let series = lookup(&self.dataset, commodity)?;
        let result = evaluate_with(
            series,
            &self.model(&spec),
            self.config.test_fraction,
            self.config.confidence,
        )?;

        self.last_evaluation.insert(commodity.to_string(), result);
        self.last_evaluation
            .get(commodity)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("No evaluation for '{}'", commodity)))
    }

    /// Forecast future periods from the stored specification.
    ///
    /// The fitted model is reused while the stored specification is unchanged.
    pub fn forecast(&mut self, commodity: &str, options: Option<ForecastOptions>) -> Result<&ForecastResult> {
        let options = options.unwrap_or_else(|| self.config.forecast_options());
        let spec = self.tuned_spec(commodity)?;
        let series = lookup(&self.dataset, commodity)?;

        let reusable = self
            .models
            .get(commodity)
            .map_or(false, |cached| cached.spec == spec && cached.full_data == options.full_data && cached.state.is_fitted());

        if !reusable {
            let sample = if options.full_data {
                series.clone()
            } else {
                series.slice(0, split_index(series.len(), self.config.test_fraction)?)?
            };
            let state = ModelState::new(self.model(&spec)).fit(&sample);
            self.models.insert(
                commodity.to_string(),
                CachedModel {
                    spec: spec.clone(),
                    full_data: options.full_data,
                    state,
                },
            );
        }

        let fitted = match self.models.get(commodity).map(|cached| &cached.state) {
            Some(ModelState::Fitted(fitted)) => fitted,
            _ => {
                // Surface the fit error and forget the failed handle
                let error = self
                    .models
                    .remove(commodity)
                    .map(|cached| cached.state.into_fitted())
                    .and_then(|r| r.err())
                    .unwrap_or_else(|| {
                        ForecastError::ForecastingError(format!("No fitted model for '{}'", commodity))
                    });
                return Err(error);
            }
        };

        let result = forecast_from(fitted, series, &options)?;
        self.last_forecast.insert(commodity.to_string(), result);
        self.last_forecast
            .get(commodity)
            .ok_or_else(|| ForecastError::ForecastingError(format!("No forecast for '{}'", commodity)))
    }

    pub fn last_evaluation(&self, commodity: &str) -> Option<&EvaluationResult> {
        self.last_evaluation.get(commodity)
    }

    pub fn last_forecast(&self, commodity: &str) -> Option<&ForecastResult> {
        self.last_forecast.get(commodity)
    }

    fn model(&self, spec: &CommodityModelSpec) -> Sarima {
        spec.model()
            .with_options(self.config.fit)
            .with_min_observations(self.config.min_observations)
    }

    /// Fresh read of a commodity's spec, refusing untuned ones when configured
    fn tuned_spec(&self, commodity: &str) -> Result<CommodityModelSpec> {
        let spec = self.store.get(commodity)?.ok_or_else(|| {
            ForecastError::StoreNotFound(format!("Commodity '{}' is not in the parameter store", commodity))
        })?;

        if !spec.is_tuned {
            if self.config.require_tuned {
                return Err(ForecastError::InvalidParameter(format!(
                    "Commodity '{}' has not been tuned since the dataset was loaded",
                    commodity
                )));
            }
            warn!(commodity, "using untuned parameters");
        }
        Ok(spec)
    }
}

fn lookup<'a>(dataset: &'a Option<Dataset>, commodity: &str) -> Result<&'a TimeSeries> {
    let dataset = dataset
        .as_ref()
        .ok_or_else(|| ForecastError::InsufficientData("No dataset loaded".to_string()))?;
    dataset.get(commodity).ok_or_else(|| {
        ForecastError::InsufficientData(format!("No series for commodity '{}'", commodity))
    })
}
