//! Seasonal ARIMA estimation and forecasting
//!
//! A single estimator covers both families: a zero seasonal order gives plain
//! ARIMA. The model fitted on the differenced series `w` is
//!
//! ```text
//! phi(B) PHI(B^m) (w_t - mu) = theta(B) THETA(B^m) e_t
//! ```
//!
//! with `mu` present only when no differencing is applied. Coefficients
//! maximise the conditional Gaussian likelihood, with `sigma^2` concentrated
//! out and pre-sample values set to zero, so every residual of the differenced
//! sample contributes. No stationarity or invertibility constraint is imposed.

use crate::data::{TimeSeries, MIN_OBSERVATIONS};
use crate::error::{ForecastError, Result};
use crate::models::{
    Forecast, ForecastModel, ForecastPoint, ModelOrder, ModelType, SeasonalOrder,
    TrainedForecastModel,
};
use price_math::differencing::{differencing_loss, full_difference};
use price_math::optimizer::{nelder_mead, NelderMeadConfig};
use price_math::polynomial::{
    ar_polynomial, differencing_polynomial, ma_polynomial, multiply, psi_weights,
    recursion_weights,
};
use price_math::stats::{mean, std_dev, two_sided_z};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Options controlling coefficient estimation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Simplex search settings; `max_iter` is the iteration ceiling (500)
    pub optimizer: NelderMeadConfig,
}

impl FitOptions {
    /// Options with a different iteration ceiling
    pub fn with_max_iter(max_iter: usize) -> Self {
        Self {
            optimizer: NelderMeadConfig {
                max_iter,
                ..NelderMeadConfig::default()
            },
        }
    }
}

/// Estimated coefficients, on the scale of the original series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Mean of the series, estimated only without differencing
    pub mean: Option<f64>,
}

impl Coefficients {
    /// `phi(B) PHI(B^m)`
    pub fn ar_polynomial(&self, m: usize) -> Vec<f64> {
        multiply(&ar_polynomial(&self.ar, 1), &ar_polynomial(&self.seasonal_ar, m))
    }

    /// `theta(B) THETA(B^m)`
    pub fn ma_polynomial(&self, m: usize) -> Vec<f64> {
        multiply(&ma_polynomial(&self.ma, 1), &ma_polynomial(&self.seasonal_ma, m))
    }
}

/// Mean and spread of the in-sample residuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualDiagnostics {
    pub mean: f64,
    pub std_dev: f64,
}

/// Position of each coefficient in the optimiser's parameter vector
#[derive(Debug, Clone, Copy)]
struct ParamLayout {
    p: usize,
    q: usize,
    seasonal_p: usize,
    seasonal_q: usize,
    constant: bool,
}

impl ParamLayout {
    fn new(order: &ModelOrder, seasonal: &SeasonalOrder) -> Self {
        Self {
            p: order.p,
            q: order.q,
            seasonal_p: seasonal.p,
            seasonal_q: seasonal.q,
            constant: order.d + seasonal.d == 0,
        }
    }

    fn len(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q + usize::from(self.constant)
    }

    fn initial(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.len());
        params.extend((0..self.p).map(|i| 0.1 / (i + 1) as f64));
        params.extend((0..self.q).map(|i| 0.1 / (i + 1) as f64));
        params.extend(std::iter::repeat(0.1).take(self.seasonal_p + self.seasonal_q));
        if self.constant {
            params.push(0.0);
        }
        params
    }

    fn split(&self, params: &[f64]) -> Coefficients {
        let (ar, rest) = params.split_at(self.p);
        let (ma, rest) = rest.split_at(self.q);
        let (seasonal_ar, rest) = rest.split_at(self.seasonal_p);
        let (seasonal_ma, rest) = rest.split_at(self.seasonal_q);

        Coefficients {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            seasonal_ar: seasonal_ar.to_vec(),
            seasonal_ma: seasonal_ma.to_vec(),
            mean: if self.constant { rest.first().copied() } else { None },
        }
    }
}

/// Nonzero `(lag, coefficient)` pairs of a lag polynomial, lag 0 excluded
fn sparse_terms(poly: &[f64]) -> Vec<(usize, f64)> {
    poly.iter()
        .enumerate()
        .skip(1)
        .filter(|(_, c)| **c != 0.0)
        .map(|(lag, c)| (lag, *c))
        .collect()
}

/// Conditional residuals of `w` with zero pre-sample values
fn conditional_residuals(w: &[f64], ar_poly: &[f64], ma_poly: &[f64], level: f64) -> Vec<f64> {
    let ar_terms = sparse_terms(ar_poly);
    let ma_terms = sparse_terms(ma_poly);
    let mut residuals: Vec<f64> = Vec::with_capacity(w.len());

    for t in 0..w.len() {
        let mut value = w[t] - level;
        for &(lag, c) in ar_terms.iter().take_while(|(lag, _)| *lag <= t) {
            value += c * (w[t - lag] - level);
        }
        for &(lag, c) in ma_terms.iter().take_while(|(lag, _)| *lag <= t) {
            value -= c * residuals[t - lag];
        }
        residuals.push(value);
    }
    residuals
}

/// SARIMA model specification, ready to be fitted
#[derive(Debug, Clone, PartialEq)]
pub struct Sarima {
    name: String,
    order: ModelOrder,
    seasonal: SeasonalOrder,
    options: FitOptions,
    min_observations: usize,
}

impl Sarima {
    /// Create a new model; a zero seasonal order gives plain ARIMA
    pub fn new(order: ModelOrder, seasonal: SeasonalOrder) -> Self {
        let name = if seasonal.is_none() {
            format!("ARIMA{}", order)
        } else {
            format!("SARIMA{}{}", order, seasonal)
        };

        Self {
            name,
            order,
            seasonal,
            options: FitOptions::default(),
            min_observations: MIN_OBSERVATIONS,
        }
    }

    /// Create a model for a model type, zeroing the seasonal order for ARIMA
    pub fn for_type(model_type: ModelType, order: ModelOrder, seasonal: SeasonalOrder) -> Self {
        Self::new(order, model_type.effective_seasonal(seasonal))
    }

    /// Replace the estimation options
    pub fn with_options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the minimum series length accepted by `fit`
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    pub fn model_type(&self) -> ModelType {
        ModelType::for_seasonal(&self.seasonal)
    }

    /// Number of estimated parameters, `sigma^2` included
    pub fn num_params(&self) -> usize {
        ParamLayout::new(&self.order, &self.seasonal).len() + 1
    }

    /// Largest autoregressive lag of the differenced model
    pub fn max_ar_lag(&self) -> usize {
        self.order.p + self.seasonal.p * self.seasonal.m
    }

    /// Whether a series of `n` observations leaves enough differenced data
    pub fn is_feasible(&self, n: usize) -> bool {
        let loss = differencing_loss(self.order.d, self.seasonal.d, self.seasonal.m);
        let free = ParamLayout::new(&self.order, &self.seasonal).len();
        n > loss && n - loss > self.max_ar_lag() + free
    }

    /// Estimate the model on `series`
    pub fn fit(&self, series: &TimeSeries) -> Result<FittedSarima> {
        series.ensure_modelable(self.min_observations)?;

        if self.seasonal.m < 2 && self.seasonal.p + self.seasonal.d + self.seasonal.q > 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal order {} needs a period of at least 2",
                self.seasonal
            )));
        }

        let layout = ParamLayout::new(&self.order, &self.seasonal);
        let m = self.seasonal.m;
        let w = full_difference(series.values(), self.order.d, self.seasonal.d, m);
        let n = w.len();

        if !self.is_feasible(series.len()) {
            return Err(ForecastError::InsufficientData(format!(
                "{} needs more than {} differenced observations, have {}",
                self.name,
                self.max_ar_lag() + layout.len(),
                n
            )));
        }

        // Standardise so the simplex works on unit-scale coefficients
        let center = if layout.constant { mean(&w)? } else { 0.0 };
        let spread = std_dev(&w, 0)?;
        let scale = if spread > f64::EPSILON { spread } else { 1.0 };
        let z: Vec<f64> = w.iter().map(|v| (v - center) / scale).collect();

        let objective = |params: &[f64]| {
            let coefficients = layout.split(params);
            let level = coefficients.mean.unwrap_or(0.0);
            let residuals = conditional_residuals(
                &z,
                &coefficients.ar_polynomial(m),
                &coefficients.ma_polynomial(m),
                level,
            );
            let css: f64 = residuals.iter().map(|e| e * e).sum();
            n as f64 / 2.0 * (css / n as f64).ln()
        };

        let minimum = nelder_mead(objective, &layout.initial(), &self.options.optimizer)?;
        if !minimum.converged {
            debug!(
                model = %self.name,
                iterations = minimum.iterations,
                "iteration ceiling reached before convergence"
            );
        }

        let scaled = layout.split(&minimum.point);
        let level = scaled.mean.unwrap_or(0.0);
        let residuals_z = conditional_residuals(
            &z,
            &scaled.ar_polynomial(m),
            &scaled.ma_polynomial(m),
            level,
        );
        let sigma2_z = residuals_z.iter().map(|e| e * e).sum::<f64>() / n as f64;
        let sigma2 = sigma2_z * scale * scale;

        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return Err(ForecastError::FitError(format!(
                "{} produced innovation variance {}",
                self.name, sigma2
            )));
        }

        let log_likelihood = -(n as f64) / 2.0 * ((2.0 * PI).ln() + sigma2.ln() + 1.0);
        if !log_likelihood.is_finite() {
            return Err(ForecastError::FitError(format!(
                "{} produced a non-finite likelihood",
                self.name
            )));
        }

        let k = self.num_params() as f64;
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * (n as f64).ln();

        let coefficients = Coefficients {
            mean: scaled.mean.map(|mu| center + scale * mu),
            ..scaled
        };

        let effective: Vec<f64> = residuals_z.iter().map(|e| e * scale).collect();
        let diagnostics = ResidualDiagnostics {
            mean: mean(&effective)?,
            std_dev: std_dev(&effective, 1).unwrap_or(0.0),
        };
        let mut residuals = vec![0.0; series.len() - n];
        residuals.extend(effective);

        if diagnostics.mean.abs() > diagnostics.std_dev.max(f64::EPSILON) {
            warn!(
                model = %self.name,
                residual_mean = diagnostics.mean,
                "residuals are biased"
            );
        }

        debug!(
            model = %self.name,
            aic,
            bic,
            sigma2,
            iterations = minimum.iterations,
            converged = minimum.converged,
            "fitted"
        );

        Ok(FittedSarima {
            name: self.name.clone(),
            order: self.order,
            seasonal: self.seasonal,
            coefficients,
            sigma2,
            log_likelihood,
            aic,
            bic,
            n_obs: n,
            converged: minimum.converged,
            iterations: minimum.iterations,
            residuals,
            diagnostics,
            history: series.clone(),
            model: self.clone(),
        })
    }
}

impl ForecastModel for Sarima {
    type Trained = FittedSarima;

    fn train(&self, data: &TimeSeries) -> Result<FittedSarima> {
        self.fit(data)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A fitted SARIMA model
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSarima {
    name: String,
    order: ModelOrder,
    seasonal: SeasonalOrder,
    coefficients: Coefficients,
    /// Innovation variance
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
    /// Observations entering the likelihood (after differencing)
    n_obs: usize,
    converged: bool,
    iterations: usize,
    /// One residual per observation; zero where differencing consumed data
    residuals: Vec<f64>,
    diagnostics: ResidualDiagnostics,
    history: TimeSeries,
    /// Specification the estimate came from
    model: Sarima,
}

impl FittedSarima {
    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    pub fn model_type(&self) -> ModelType {
        ModelType::for_seasonal(&self.seasonal)
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        self.bic
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Whether the optimiser met its tolerance before the iteration ceiling
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn diagnostics(&self) -> ResidualDiagnostics {
        self.diagnostics
    }

    /// The series the model was fitted on
    pub fn history(&self) -> &TimeSeries {
        &self.history
    }

    pub fn model(&self) -> &Sarima {
        &self.model
    }

    /// Forecast `horizon` steps past the end of the fitted series.
    ///
    /// Bounds are `point +/- z * sigma * sqrt(sum psi_j^2)` where `psi` are the
    /// weights of the MA representation of the integrated model.
    pub fn forecast(&self, horizon: usize, confidence: f64) -> Result<Forecast> {
        if horizon == 0 {
            return Err(ForecastError::ForecastingError(
                "Forecast horizon must be greater than zero".to_string(),
            ));
        }
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ForecastError::ForecastingError(format!(
                "Confidence level must lie strictly between 0 and 1, got {}",
                confidence
            )));
        }

        let m = self.seasonal.m;
        let stationary_ar = self.coefficients.ar_polynomial(m);
        let full_ar = multiply(
            &stationary_ar,
            &differencing_polynomial(self.order.d, self.seasonal.d, m),
        );
        let ma_poly = self.coefficients.ma_polynomial(m);

        let constant = self
            .coefficients
            .mean
            .map_or(0.0, |mu| mu * stationary_ar.iter().sum::<f64>());

        let weights = recursion_weights(&full_ar);
        let ma_terms = sparse_terms(&ma_poly);
        let n = self.history.len();

        let mut path = self.history.values().to_vec();
        path.reserve(horizon);
        for t in n..n + horizon {
            let mut value = constant;
            for (i, a) in weights.iter().enumerate() {
                let lag = i + 1;
                if *a != 0.0 && lag <= t {
                    value += a * path[t - lag];
                }
            }
            for &(lag, c) in &ma_terms {
                // Future innovations are zero
                if t >= lag && t - lag < n {
                    value += c * self.residuals[t - lag];
                }
            }
            path.push(value);
        }

        let z = two_sided_z(confidence)?;
        let psi = psi_weights(&full_ar, &ma_poly, horizon);
        let timestamps = self.history.future_timestamps(horizon)?;

        let mut cumulative = 0.0;
        let points = timestamps
            .into_iter()
            .zip(&path[n..])
            .zip(&psi)
            .map(|((timestamp, &point), psi_j)| {
                cumulative += psi_j * psi_j;
                let half_width = z * (self.sigma2 * cumulative).sqrt();
                ForecastPoint {
                    timestamp,
                    point,
                    lower: point - half_width,
                    upper: point + half_width,
                }
            })
            .collect::<Vec<_>>();

        if points.iter().any(|p| !p.point.is_finite()) {
            return Err(ForecastError::ForecastingError(format!(
                "{} produced non-finite forecasts",
                self.name
            )));
        }

        Forecast::new(points, confidence)
    }
}

impl TrainedForecastModel for FittedSarima {
    fn forecast(&self, horizon: usize, confidence: f64) -> Result<Forecast> {
        FittedSarima::forecast(self, horizon, confidence)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use crate::data::Frequency;

    fn weekly(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2020, 1, 6, 0, 0, 0).unwrap();
        TimeSeries::regular(start, Frequency::Weekly, values).unwrap()
    }

    fn ar1(n: usize, phi: f64, level: f64) -> Vec<f64> {
        let mut state: u64 = 7;
        let mut x = 0.0;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let e = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
                x = phi * x + e;
                level + x
            })
            .collect()
    }

    #[test]
    fn test_layout_split() {
        let layout = ParamLayout::new(&ModelOrder::new(2, 0, 1), &SeasonalOrder::new(1, 0, 0, 4));
        assert_eq!(layout.len(), 5);
        let c = layout.split(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(c.ar, vec![0.1, 0.2]);
        assert_eq!(c.ma, vec![0.3]);
        assert_eq!(c.seasonal_ar, vec![0.4]);
        assert!(c.seasonal_ma.is_empty());
        assert_eq!(c.mean, Some(0.5));
    }

    #[test]
    fn test_conditional_residuals_white_noise_model() {
        let w = [1.0, 2.0, 3.0];
        let e = conditional_residuals(&w, &[1.0], &[1.0], 2.0);
        assert_eq!(e, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_recovers_ar_coefficient() {
        let series = weekly(ar1(300, 0.7, 50.0));
        let fitted = Sarima::new(ModelOrder::new(1, 0, 0), SeasonalOrder::NONE)
            .fit(&series)
            .unwrap();

        assert_relative_eq!(fitted.coefficients().ar[0], 0.7, epsilon = 0.1);
        assert_relative_eq!(fitted.coefficients().mean.unwrap(), 50.0, epsilon = 0.2);
        assert!(fitted.aic().is_finite());
        assert!(fitted.bic() > fitted.aic());
    }

    #[test]
    fn test_random_walk_forecast_is_flat() {
        let values: Vec<f64> = ar1(80, 1.0, 100.0);
        let last = *values.last().unwrap();
        let fitted = Sarima::new(ModelOrder::new(0, 1, 0), SeasonalOrder::NONE)
            .fit(&weekly(values))
            .unwrap();

        let forecast = fitted.forecast(3, 0.95).unwrap();
        for p in forecast.points() {
            assert_relative_eq!(p.point, last);
        }
        let widths: Vec<f64> = forecast.points().iter().map(|p| p.upper - p.lower).collect();
        assert!(widths[0] < widths[1] && widths[1] < widths[2]);
        assert_relative_eq!(widths[1] / widths[0], 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_infeasible_order() {
        let series = weekly(ar1(40, 0.5, 10.0));
        let err = Sarima::new(ModelOrder::new(1, 0, 0), SeasonalOrder::new(1, 1, 0, 52))
            .fit(&series)
            .unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData(_)));
    }

    #[test]
    fn test_forecast_rejects_bad_arguments() {
        let fitted = Sarima::new(ModelOrder::new(1, 0, 0), SeasonalOrder::NONE)
            .fit(&weekly(ar1(60, 0.5, 10.0)))
            .unwrap();
        assert!(matches!(
            fitted.forecast(0, 0.95),
            Err(ForecastError::ForecastingError(_))
        ));
        assert!(matches!(
            fitted.forecast(3, 1.0),
            Err(ForecastError::ForecastingError(_))
        ));
    }
}
