use chrono::{TimeZone, Utc};
use price_forecast::export::forecast_csv_string;
use price_forecast::{
    CommodityModelSpec, Dataset, ForecastConfig, Frequency, ModelOrder, ParamStore, SearchSpace,
    SeasonalOrder, Session, TimeSeries,
};
use std::collections::BTreeMap;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Price Forecast: Tune and Forecast Example");
    println!("=========================================\n");

    // Bootstrap a parameter store in a scratch directory
    let dir = tempfile::tempdir()?;
    let params_file = dir.path().join("best_params.json");
    let mut specs = BTreeMap::new();
    specs.insert(
        "Beras Premium".to_string(),
        CommodityModelSpec::untuned(ModelOrder::new(1, 1, 1), SeasonalOrder::new(1, 1, 1, 52)),
    );
    ParamStore::new(&params_file).save(&specs)?;

    let config = ForecastConfig {
        params_file,
        search: SearchSpace {
            m: 13,
            max_models: 30,
            ..SearchSpace::default()
        },
        ..ForecastConfig::default()
    };
    let mut session = Session::new(config);

    println!("Creating sample data...");
    let series = create_sample_weekly_data()?;
    println!("Sample data created: {} weekly points\n", series.len());

    let mut dataset = Dataset::new();
    dataset.insert("Beras Premium", series);
    session.load_dataset(dataset)?;

    let validation = session.validate_series("Beras Premium")?;
    println!("Series valid: {}", validation.valid);
    for warning in &validation.warnings {
        println!("  warning: {}", warning);
    }

    println!("\nSearching model orders...");
    let outcome = session.tune("Beras Premium")?;
    println!(
        "Selected {} {} {} after {} fits (AIC seasonal: {:?}, non-seasonal: {:?})\n",
        outcome.spec.model_type,
        outcome.spec.order,
        outcome.spec.seasonal_order,
        outcome.models_fitted,
        outcome.aic_seasonal,
        outcome.aic_non_seasonal
    );

    let evaluation = session.validate("Beras Premium")?;
    println!(
        "Hold-out validation on {} points:\n{}",
        evaluation.test.len(),
        evaluation.metrics
    );

    let forecast = session.forecast("Beras Premium", None)?;
    println!("Forecast for the next {} weeks:", forecast.periods);
    print!("{}", forecast_csv_string(&forecast.forecast)?);

    Ok(())
}

/// Weekly prices with a slow trend and a quarterly cycle
fn create_sample_weekly_data() -> Result<TimeSeries, Box<dyn std::error::Error>> {
    let start = Utc
        .with_ymd_and_hms(2021, 1, 3, 0, 0, 0)
        .single()
        .ok_or("invalid start date")?;

    let values = (0..156)
        .map(|i| {
            let t = i as f64;
            let trend = 12_500.0 + 8.0 * t;
            let cycle = 250.0 * (2.0 * std::f64::consts::PI * t / 13.0).sin();
            let wiggle = 60.0 * (t * 1.7).sin() + 35.0 * (t * 0.37).cos();
            trend + cycle + wiggle
        })
        .collect();

    Ok(TimeSeries::regular(start, Frequency::Weekly, values)?)
}
