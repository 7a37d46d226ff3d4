//! # Price Forecast
//!
//! Model selection, fitting, validation and forecasting of commodity price
//! series with seasonal and non-seasonal ARIMA models.
//!
//! ## Features
//!
//! - One SARIMA estimator for both families (a zero seasonal order is ARIMA)
//! - Point forecasts with confidence bounds
//! - Stepwise order search comparing seasonal and non-seasonal candidates by AIC
//! - JSON parameter store with atomic, verified writes
//! - Chronological hold-out validation with MAE, RMSE and MAPE
//!
//! ## Quick Start
//!
//! ```no_run
//! use price_forecast::{
//!     evaluate, forecast_future, search, ForecastOptions, ModelType, ParamStore,
//!     SearchSpace, TimeSeries,
//! };
//! # fn run(series: TimeSeries) -> price_forecast::error::Result<()> {
//! let store = ParamStore::new("models/best_params.json");
//!
//! // Pick and commit the best orders for a commodity
//! let outcome = search(&series, "Gula", SearchSpace::default(), &store)?;
//!
//! // Validate them on the last 20% of the series
//! let spec = outcome.spec;
//! let validation = evaluate(&series, spec.order, spec.seasonal_order, spec.model_type, 0.2)?;
//! println!("{}", validation.metrics);
//!
//! // Forecast the next 12 periods
//! let forecast = forecast_future(&series, &spec, &ForecastOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod metrics;
pub mod models;
pub mod report;
pub mod search;
pub mod session;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use crate::config::ForecastConfig;
pub use crate::data::{validate_series, Dataset, Frequency, SeriesValidation, TimeSeries};
pub use crate::error::ForecastError;
pub use crate::evaluation::{evaluate, forecast_future, EvaluationResult, ForecastOptions, ForecastResult};
pub use crate::metrics::{AccuracyBand, ForecastMetrics};
pub use crate::models::{
    FittedSarima, Forecast, ForecastModel, ForecastPoint, ModelOrder, ModelState, ModelType,
    Sarima, SeasonalOrder, TrainedForecastModel,
};
pub use crate::report::Outcome;
pub use crate::search::{search, OrderSearch, SearchSpace, TuningOutcome};
pub use crate::session::Session;
pub use crate::store::{CommodityModelSpec, ParamStore, ValidationReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
