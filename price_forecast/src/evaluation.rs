//! Hold-out validation and future forecasting of a commodity series

use crate::data::TimeSeries;
use crate::error::Result;
use crate::metrics::{evaluate_model, AccuracyBand, ForecastMetrics};
use crate::models::{
    FittedSarima, ForecastPoint, ModelOrder, ModelState, ModelType, Sarima, SeasonalOrder,
};
use crate::store::CommodityModelSpec;
use crate::utils::{split_index, train_test_split};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Share of the series held out by default
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Two-sided coverage of forecast bounds by default
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Outcome of a hold-out validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub model_type: ModelType,
    pub order: ModelOrder,
    pub seasonal_order: SeasonalOrder,
    pub train: TimeSeries,
    pub test: TimeSeries,
    /// One point per test timestamp
    pub forecast: Vec<ForecastPoint>,
    pub metrics: ForecastMetrics,
    pub success: bool,
}

impl EvaluationResult {
    /// Advisory interpretation of the MAPE
    pub fn accuracy_band(&self) -> Option<AccuracyBand> {
        self.metrics.accuracy_band()
    }
}

/// Fit on the first `1 - test_fraction` of the series, forecast the rest at
/// 95% and score the point forecasts.
///
/// `model_type = ARIMA` zeroes the seasonal order.
pub fn evaluate(
    series: &TimeSeries,
    order: ModelOrder,
    seasonal_order: SeasonalOrder,
    model_type: ModelType,
    test_fraction: f64,
) -> Result<EvaluationResult> {
    let model = Sarima::for_type(model_type, order, seasonal_order);
    evaluate_with(series, &model, test_fraction, DEFAULT_CONFIDENCE)
}

/// Hold-out validation of an already configured model
pub fn evaluate_with(
    series: &TimeSeries,
    model: &Sarima,
    test_fraction: f64,
    confidence: f64,
) -> Result<EvaluationResult> {
    let (train, test) = train_test_split(series, test_fraction)?;
    let (forecast, metrics) = evaluate_model(model, &train, &test, confidence)?;

    // Align with the observed test timestamps
    let forecast: Vec<ForecastPoint> = forecast
        .points()
        .iter()
        .zip(test.timestamps())
        .map(|(point, &timestamp)| ForecastPoint { timestamp, ..*point })
        .collect();

    info!(
        model = %model.order(),
        seasonal_order = %model.seasonal_order(),
        train = train.len(),
        test = test.len(),
        mape = ?metrics.mape,
        "evaluation finished"
    );

    Ok(EvaluationResult {
        model_type: model.model_type(),
        order: model.order(),
        seasonal_order: model.seasonal_order(),
        train,
        test,
        forecast,
        metrics,
        success: true,
    })
}

/// Options of a future forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastOptions {
    /// Number of future periods
    pub periods: usize,
    /// Fit on the whole series; otherwise on the first 80% only
    pub full_data: bool,
    pub confidence: f64,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            periods: 12,
            full_data: true,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Future forecast of a commodity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// One point per future period
    pub forecast: Vec<ForecastPoint>,
    /// The series the forecast was requested for
    pub original_series: TimeSeries,
    pub periods: usize,
    pub model_type: ModelType,
    pub order: ModelOrder,
    pub seasonal_order: SeasonalOrder,
    pub confidence: f64,
    pub success: bool,
}

/// Fit the model of `spec` for a future forecast
pub fn fit_for_forecast(
    series: &TimeSeries,
    spec: &CommodityModelSpec,
    full_data: bool,
) -> Result<FittedSarima> {
    let sample = if full_data {
        series.clone()
    } else {
        series.slice(0, split_index(series.len(), DEFAULT_TEST_FRACTION)?)?
    };

    ModelState::new(spec.model()).fit(&sample).into_fitted()
}

/// Forecast `options.periods` steps from an already fitted model.
///
/// Periods are labelled from the last observation of `series`, also when the
/// model was fitted on its leading part only.
pub fn forecast_from(
    fitted: &FittedSarima,
    series: &TimeSeries,
    options: &ForecastOptions,
) -> Result<ForecastResult> {
    let forecast = fitted.forecast(options.periods, options.confidence)?;
    let points = forecast
        .points()
        .iter()
        .zip(series.future_timestamps(options.periods)?)
        .map(|(point, timestamp)| ForecastPoint { timestamp, ..*point })
        .collect();

    Ok(ForecastResult {
        forecast: points,
        original_series: series.clone(),
        periods: options.periods,
        model_type: fitted.model_type(),
        order: fitted.order(),
        seasonal_order: fitted.seasonal_order(),
        confidence: forecast.confidence(),
        success: true,
    })
}

/// Fit the stored specification and forecast future periods
pub fn forecast_future(
    series: &TimeSeries,
    spec: &CommodityModelSpec,
    options: &ForecastOptions,
) -> Result<ForecastResult> {
    let fitted = fit_for_forecast(series, spec, options.full_data)?;
    forecast_from(&fitted, series, options)
}
