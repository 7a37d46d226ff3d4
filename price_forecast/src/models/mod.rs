//! Forecasting models for commodity price series

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

pub mod sarima;
pub mod state;

pub use sarima::{FitOptions, FittedSarima, Sarima};
pub use state::ModelState;

/// Non-seasonal order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct ModelOrder {
    /// Autoregressive degree
    pub p: usize,
    /// Differencing degree
    pub d: usize,
    /// Moving-average degree
    pub q: usize,
}

impl ModelOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl From<[usize; 3]> for ModelOrder {
    fn from([p, d, q]: [usize; 3]) -> Self {
        Self { p, d, q }
    }
}

impl From<ModelOrder> for [usize; 3] {
    fn from(order: ModelOrder) -> Self {
        [order.p, order.d, order.q]
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Seasonal order `(P, D, Q, m)`; the zero quadruple means "no seasonal part"
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "[usize; 4]", into = "[usize; 4]")]
pub struct SeasonalOrder {
    /// Seasonal autoregressive degree
    pub p: usize,
    /// Seasonal differencing degree
    pub d: usize,
    /// Seasonal moving-average degree
    pub q: usize,
    /// Season length in observations (52 for weekly data with a yearly cycle)
    pub m: usize,
}

impl SeasonalOrder {
    /// The "no seasonal component" order `(0, 0, 0, 0)`
    pub const NONE: SeasonalOrder = SeasonalOrder {
        p: 0,
        d: 0,
        q: 0,
        m: 0,
    };

    pub const fn new(p: usize, d: usize, q: usize, m: usize) -> Self {
        Self { p, d, q, m }
    }

    /// True for the zero quadruple
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// True when the order contributes any seasonal term
    pub fn has_seasonal_terms(&self) -> bool {
        self.m > 1 && (self.p > 0 || self.d > 0 || self.q > 0)
    }

    /// Collapse orders without seasonal terms to the zero quadruple
    pub fn normalized(self) -> Self {
        if self.has_seasonal_terms() {
            self
        } else {
            Self::NONE
        }
    }
}

impl From<[usize; 4]> for SeasonalOrder {
    fn from([p, d, q, m]: [usize; 4]) -> Self {
        Self { p, d, q, m }
    }
}

impl From<SeasonalOrder> for [usize; 4] {
    fn from(order: SeasonalOrder) -> Self {
        [order.p, order.d, order.q, order.m]
    }
}

impl fmt::Display for SeasonalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{},{})", self.p, self.d, self.q, self.m)
    }
}

/// Model family of a commodity specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "ARIMA")]
    Arima,
    #[serde(rename = "SARIMA")]
    Sarima,
}

impl ModelType {
    /// The model type implied by a seasonal order
    pub fn for_seasonal(seasonal: &SeasonalOrder) -> Self {
        if seasonal.is_none() {
            ModelType::Arima
        } else {
            ModelType::Sarima
        }
    }

    /// Seasonal order actually used when fitting this model type
    pub fn effective_seasonal(&self, seasonal: SeasonalOrder) -> SeasonalOrder {
        match self {
            ModelType::Arima => SeasonalOrder::NONE,
            ModelType::Sarima => seasonal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Arima => "ARIMA",
            ModelType::Sarima => "SARIMA",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ARIMA" => Ok(ModelType::Arima),
            "SARIMA" => Ok(ModelType::Sarima),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown model type '{}'",
                other
            ))),
        }
    }
}

/// One forecast step with its confidence bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Forecast produced by a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Forecast steps in chronological order
    points: Vec<ForecastPoint>,
    /// Two-sided coverage of the bounds
    confidence: f64,
}

impl Forecast {
    /// Create a new forecast
    pub fn new(points: Vec<ForecastPoint>, confidence: f64) -> Result<Self> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ForecastError::ForecastingError(format!(
                "Confidence level must lie strictly between 0 and 1, got {}",
                confidence
            )));
        }

        Ok(Self { points, confidence })
    }

    /// Get the forecast steps
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Get the point forecasts
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.point).collect()
    }

    /// Get the `(lower, upper)` bounds
    pub fn intervals(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.lower, p.upper)).collect()
    }

    /// Get the forecast timestamps
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Get the number of periods forecasted
    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    /// Get the confidence level of the bounds
    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate a forecast for `horizon` future periods
    fn forecast(&self, horizon: usize, confidence: f64) -> Result<Forecast>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on time series data
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on time series data
    fn train(&self, data: &TimeSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
