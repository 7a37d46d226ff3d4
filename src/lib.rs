//! # Food Price Workspace
//!
//! Facade over the workspace crates:
//!
//! - [`price_math`]: numeric kernels (differencing, polynomials, optimiser,
//!   stationarity tests)
//! - [`price_forecast`]: model search, validation, forecasting and the
//!   parameter store
//!
//! ## Example
//!
//! ```
//! use food_price_workspace::forecast::{ModelOrder, SeasonalOrder, Sarima};
//!
//! let model = Sarima::new(ModelOrder::new(1, 1, 1), SeasonalOrder::new(1, 1, 1, 52));
//! assert_eq!(model.num_params(), 5);
//! ```

pub use price_forecast as forecast;
pub use price_math as math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_reaches_both_crates() {
        assert_eq!(math::stats::mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_eq!(forecast::NAME, "price_forecast");
    }
}
