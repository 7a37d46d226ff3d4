use price_forecast::error::ForecastError;
use price_math::MathError;
use std::io;

#[test]
fn test_error_conversion() {
    // Test IO error conversion
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);

    match forecast_error {
        ForecastError::IoError(_) => {}
        _ => panic!("Expected IoError variant"),
    }

    // Malformed store content
    let json_error = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
    let forecast_error = ForecastError::from(json_error);

    match forecast_error {
        ForecastError::StoreParse(_) => {}
        _ => panic!("Expected StoreParse variant"),
    }

    // Numeric kernel failure
    let math_error = MathError::InsufficientData("need 2 points".to_string());
    let forecast_error = ForecastError::from(math_error);
    assert_eq!(forecast_error.kind(), "MathError");
}

#[test]
fn test_error_display() {
    let error = ForecastError::InvalidParameter("confidence must lie in (0, 1)".to_string());
    let error_string = format!("{}", error);

    assert!(error_string.contains("confidence must lie in (0, 1)"));

    // Test with source error
    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let error = ForecastError::from(io_error);
    let error_string = format!("{}", error);

    assert!(error_string.contains("IO error"));
    assert!(error_string.contains("permission denied"));
}

#[test]
fn test_error_kinds() {
    let cases = [
        (ForecastError::InsufficientData(String::new()), "InsufficientDataError"),
        (ForecastError::FitError(String::new()), "FitError"),
        (ForecastError::ForecastingError(String::new()), "ForecastError"),
        (ForecastError::StoreNotFound(String::new()), "StoreNotFoundError"),
        (ForecastError::StoreParse(String::new()), "StoreParseError"),
        (ForecastError::StoreVerification(String::new()), "StoreVerificationError"),
        (ForecastError::SearchExhausted(String::new()), "SearchExhaustedError"),
        (ForecastError::DivisionError(String::new()), "DivisionError"),
    ];

    for (error, kind) in cases {
        assert_eq!(error.kind(), kind);
    }
}
