//! Lifecycle of a model handle
//!
//! `Unfit -> {Fitted, FitFailed}`. Forecasting is only possible from
//! `Fitted`; any other state yields a forecast error. A fitted handle can
//! forecast any number of times without refitting.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{Forecast, FittedSarima, Sarima};
use tracing::warn;

/// A model together with where it is in its lifecycle
#[derive(Debug)]
pub enum ModelState {
    /// Specified but not yet estimated
    Unfit(Sarima),
    /// Estimated and ready to forecast
    Fitted(FittedSarima),
    /// Estimation failed; the model can be fitted again on other data
    FitFailed {
        model: Sarima,
        error: ForecastError,
    },
}

impl ModelState {
    pub fn new(model: Sarima) -> Self {
        ModelState::Unfit(model)
    }

    /// Fit (or refit) the model on `series`
    pub fn fit(self, series: &TimeSeries) -> Self {
        let model = match self {
            ModelState::Unfit(model) | ModelState::FitFailed { model, .. } => model,
            ModelState::Fitted(fitted) => fitted.model().clone(),
        };

        match model.fit(series) {
            Ok(fitted) => ModelState::Fitted(fitted),
            Err(error) => {
                warn!(error = %error, "model fit failed");
                ModelState::FitFailed { model, error }
            }
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, ModelState::Fitted(_))
    }

    /// Short name of the state
    pub fn label(&self) -> &'static str {
        match self {
            ModelState::Unfit(_) => "unfit",
            ModelState::Fitted(_) => "fitted",
            ModelState::FitFailed { .. } => "fit_failed",
        }
    }

    /// The fitted model, if any
    pub fn fitted(&self) -> Option<&FittedSarima> {
        match self {
            ModelState::Fitted(fitted) => Some(fitted),
            _ => None,
        }
    }

    /// Take the fitted model, surfacing the fit error if estimation failed
    pub fn into_fitted(self) -> Result<FittedSarima> {
        match self {
            ModelState::Fitted(fitted) => Ok(fitted),
            ModelState::FitFailed { error, .. } => Err(error),
            ModelState::Unfit(model) => Err(ForecastError::ForecastingError(format!(
                "{} has not been fitted",
                model.order()
            ))),
        }
    }

    /// Forecast from a fitted model
    pub fn forecast(&self, horizon: usize, confidence: f64) -> Result<Forecast> {
        match self {
            ModelState::Fitted(fitted) => fitted.forecast(horizon, confidence),
            other => Err(ForecastError::ForecastingError(format!(
                "Cannot forecast from a model in state '{}'",
                other.label()
            ))),
        }
    }
}
