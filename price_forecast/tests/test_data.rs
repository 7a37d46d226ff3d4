use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use price_forecast::data::{validate_series, Dataset, Frequency, TimeSeries};
use price_forecast::ForecastError;

fn weekly_series(values: Vec<f64>) -> TimeSeries {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    TimeSeries::regular(start, Frequency::Weekly, values).unwrap()
}

#[test]
fn test_series_rejects_unordered_timestamps() {
    let dates = vec![
        Utc.with_ymd_and_hms(2023, 1, 8, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
    ];

    let result = TimeSeries::new(dates, vec![100.0, 101.0]);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_series_rejects_length_mismatch() {
    let dates = vec![Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()];

    let result = TimeSeries::new(dates, vec![100.0, 101.0]);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_frequency_inference() {
    let weekly = weekly_series(vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(weekly.frequency().unwrap(), Frequency::Weekly);

    let start = Utc.with_ymd_and_hms(2023, 1, 31, 0, 0, 0).unwrap();
    let monthly = TimeSeries::regular(start, Frequency::Monthly, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(monthly.frequency().unwrap(), Frequency::Monthly);
}

#[test]
fn test_future_timestamps_follow_last_observation() {
    let series = weekly_series(vec![10.0, 11.0, 12.0]);
    let last = series.last_timestamp().unwrap();

    let future = series.future_timestamps(3).unwrap();
    assert_eq!(future.len(), 3);
    assert_eq!(future[0], last + chrono::Duration::weeks(1));
    assert!(future.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_slice_and_split() {
    let series = weekly_series((0..10).map(|i| i as f64).collect());

    let subset = series.slice(2, 5).unwrap();
    assert_eq!(subset.values(), &[2.0, 3.0, 4.0]);

    let (head, tail) = series.split_at(8).unwrap();
    assert_eq!(head.len(), 8);
    assert_eq!(tail.len(), 2);
    assert_eq!(tail.timestamps()[0], series.timestamps()[8]);

    assert!(series.slice(5, 11).is_err());
}

#[test]
fn test_ensure_modelable() {
    let short = weekly_series(vec![1.0; 10]);
    assert!(matches!(
        short.ensure_modelable(30),
        Err(ForecastError::InsufficientData(_))
    ));

    let flat = weekly_series(vec![15_000.0; 40]);
    let err = flat.ensure_modelable(30).unwrap_err();
    assert!(err.to_string().contains("zero variance"));

    let varied = weekly_series((0..40).map(|i| 15_000.0 + (i % 5) as f64).collect());
    assert!(varied.ensure_modelable(30).is_ok());
}

#[test]
fn test_validate_series_warnings() {
    let mut values: Vec<Option<f64>> = (0..40).map(|i| Some(100.0 + i as f64)).collect();
    for v in values.iter_mut().take(6) {
        *v = None;
    }

    let report = validate_series(&values, 30);
    assert!(report.valid);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("15.0% missing"));
    assert_eq!(report.info.unwrap().length, 40);
}

#[test]
fn test_summary_statistics() {
    let summary = weekly_series(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).summary().unwrap();
    assert_eq!(summary.length, 8);
    assert_eq!(summary.min, 2.0);
    assert_eq!(summary.max, 9.0);
    assert_relative_eq!(summary.mean, 5.0);
    // Sample standard deviation: sqrt(32 / 7)
    assert_relative_eq!(summary.std_dev, (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);

    let single = weekly_series(vec![13_250.0]).summary().unwrap();
    assert_eq!(single.std_dev, 0.0);

    // Missing entries count towards length only
    let report = validate_series(&[Some(2.0), None, Some(4.0), Some(6.0)], 1);
    let info = report.info.unwrap();
    assert_eq!(info.length, 4);
    assert_relative_eq!(info.mean, 4.0);
    assert_relative_eq!(info.std_dev, 2.0, epsilon = 1e-12);
}

#[test]
fn test_validate_series_invalid() {
    let short: Vec<Option<f64>> = (0..5).map(|i| Some(i as f64)).collect();
    let report = validate_series(&short, 30);
    assert!(!report.valid);

    let flat = vec![Some(42.0); 50];
    let report = validate_series(&flat, 30);
    assert!(!report.valid);
    assert!(report.warnings.iter().any(|w| w.contains("no variation")));

    let empty = validate_series(&[], 30);
    assert!(!empty.valid);
    assert!(empty.info.is_none());
}

#[test]
fn test_dataset_operations() {
    let mut dataset = Dataset::new();
    assert!(dataset.is_empty());

    dataset.insert("Gula", weekly_series(vec![1.0, 2.0]));
    dataset.insert("Beras Premium", weekly_series(vec![3.0, 4.0]));

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.commodities(), vec!["Beras Premium", "Gula"]);
    assert_eq!(dataset.get("Gula").unwrap().values(), &[1.0, 2.0]);
    assert!(dataset.get("Minyak").is_none());
}
