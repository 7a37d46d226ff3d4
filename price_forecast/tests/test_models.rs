use chrono::{TimeZone, Utc};
use price_forecast::data::{Frequency, TimeSeries};
use price_forecast::models::{
    FitOptions, ForecastModel, ModelOrder, ModelState, ModelType, Sarima, SeasonalOrder,
    TrainedForecastModel,
};
use price_forecast::ForecastError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

// Helper function to create an AR(1) price series around 15,000
fn create_test_data(n: usize, seed: u64) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 150.0).unwrap();

    let mut values = Vec::with_capacity(n);
    let mut deviation = 0.0;
    for _ in 0..n {
        deviation = 0.6 * deviation + noise.sample(&mut rng);
        values.push(15_000.0 + deviation);
    }

    let start = Utc.with_ymd_and_hms(2020, 1, 5, 0, 0, 0).unwrap();
    TimeSeries::regular(start, Frequency::Weekly, values).unwrap()
}

// Quarterly pattern with period 4 on top of noise
fn create_seasonal_data(n: usize, seed: u64) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 40.0).unwrap();
    let pattern = [300.0, -100.0, -400.0, 200.0];

    let values = (0..n)
        .map(|i| 12_000.0 + pattern[i % 4] + noise.sample(&mut rng))
        .collect();

    let start = Utc.with_ymd_and_hms(2020, 1, 5, 0, 0, 0).unwrap();
    TimeSeries::regular(start, Frequency::Weekly, values).unwrap()
}

#[test]
fn test_arima_fit_and_forecast() {
    let data = create_test_data(120, 7);
    let model = Sarima::new(ModelOrder::new(1, 0, 1), SeasonalOrder::NONE);
    assert_eq!(model.model_type(), ModelType::Arima);

    let fitted = model.fit(&data).unwrap();
    assert!(fitted.aic().is_finite());
    assert!(fitted.bic().is_finite());
    assert!(fitted.sigma2() > 0.0);
    assert_eq!(fitted.n_obs(), 120);
    assert_eq!(fitted.residuals().len(), 120);

    let forecast = fitted.forecast(12, 0.95).unwrap();
    assert_eq!(forecast.horizon(), 12);

    let last = data.last_timestamp().unwrap();
    let timestamps = forecast.timestamps();
    assert!(timestamps[0] > last);
    assert!(timestamps.windows(2).all(|w| w[1] > w[0]));

    for point in forecast.points() {
        assert!(point.lower <= point.point && point.point <= point.upper);
    }

    // Intervals widen with the horizon
    let widths: Vec<f64> = forecast.intervals().iter().map(|(l, u)| u - l).collect();
    assert!(widths.windows(2).all(|w| w[1] >= w[0] - 1e-9));
}

#[test]
fn test_sarima_fit_and_forecast() {
    let data = create_seasonal_data(96, 11);
    let model = Sarima::new(ModelOrder::new(1, 0, 0), SeasonalOrder::new(1, 0, 0, 4));
    assert_eq!(model.model_type(), ModelType::Sarima);

    let fitted = model.fit(&data).unwrap();
    let forecast = fitted.forecast(8, 0.95).unwrap();

    // The seasonal pattern carries over: same phase one period apart
    let values = forecast.values();
    assert!((values[0] - values[4]).abs() < (values[0] - values[2]).abs());
}

#[test]
fn test_constant_series_is_rejected() {
    let start = Utc.with_ymd_and_hms(2020, 1, 5, 0, 0, 0).unwrap();
    let data = TimeSeries::regular(start, Frequency::Weekly, vec![15_000.0; 60]).unwrap();

    let result = Sarima::new(ModelOrder::new(1, 1, 1), SeasonalOrder::NONE).fit(&data);
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn test_short_series_is_rejected() {
    let data = create_test_data(20, 1);

    let result = Sarima::new(ModelOrder::new(1, 0, 0), SeasonalOrder::NONE).fit(&data);
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn test_invalid_forecast_arguments() {
    let data = create_test_data(80, 3);
    let fitted = Sarima::new(ModelOrder::new(1, 0, 0), SeasonalOrder::NONE)
        .fit(&data)
        .unwrap();

    assert!(matches!(
        fitted.forecast(0, 0.95),
        Err(ForecastError::ForecastingError(_))
    ));
    assert!(matches!(
        fitted.forecast(5, 1.0),
        Err(ForecastError::ForecastingError(_))
    ));
}

#[test]
fn test_higher_confidence_gives_wider_bounds() {
    let data = create_test_data(80, 5);
    let fitted = Sarima::new(ModelOrder::new(1, 1, 0), SeasonalOrder::NONE)
        .fit(&data)
        .unwrap();

    let narrow = fitted.forecast(4, 0.80).unwrap();
    let wide = fitted.forecast(4, 0.95).unwrap();

    for (n, w) in narrow.points().iter().zip(wide.points()) {
        assert!((n.point - w.point).abs() < 1e-9);
        assert!(w.upper - w.lower > n.upper - n.lower);
    }
}

#[test]
fn test_arima_type_ignores_seasonal_order() {
    let model = Sarima::for_type(
        ModelType::Arima,
        ModelOrder::new(1, 1, 1),
        SeasonalOrder::new(1, 1, 1, 52),
    );

    assert_eq!(model.seasonal_order(), SeasonalOrder::NONE);
    assert_eq!(model.model_type(), ModelType::Arima);
}

#[test]
fn test_trait_interface() {
    let data = create_test_data(60, 9);
    let model = Sarima::new(ModelOrder::new(0, 1, 1), SeasonalOrder::NONE)
        .with_options(FitOptions::with_max_iter(200));

    let trained = ForecastModel::train(&model, &data).unwrap();
    let forecast = TrainedForecastModel::forecast(&trained, 3, 0.9).unwrap();

    assert_eq!(forecast.horizon(), 3);
    assert_eq!(forecast.confidence(), 0.9);
    assert!(trained.name().starts_with("ARIMA"));
}

#[test]
fn test_model_state_transitions() {
    let data = create_test_data(60, 13);
    let model = Sarima::new(ModelOrder::new(1, 0, 0), SeasonalOrder::NONE);

    let state = ModelState::new(model.clone());
    assert_eq!(state.label(), "unfit");
    assert!(state.forecast(3, 0.95).is_err());

    let state = state.fit(&data);
    assert_eq!(state.label(), "fitted");
    assert!(state.forecast(3, 0.95).is_ok());

    let failed = ModelState::new(model).fit(&create_test_data(10, 13));
    assert_eq!(failed.label(), "fit_failed");
    assert!(matches!(
        failed.into_fitted(),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_order_serialization() {
    let order: ModelOrder = serde_json::from_str("[2, 1, 0]").unwrap();
    assert_eq!(order, ModelOrder::new(2, 1, 0));
    assert_eq!(order.to_string(), "(2,1,0)");

    let seasonal = SeasonalOrder::new(1, 1, 1, 52);
    assert_eq!(serde_json::to_string(&seasonal).unwrap(), "[1,1,1,52]");
    assert_eq!("sarima".parse::<ModelType>().unwrap(), ModelType::Sarima);
    assert!("prophet".parse::<ModelType>().is_err());
}
