//! Forecast table export as CSV

use crate::error::{ForecastError, Result};
use crate::models::ForecastPoint;
use crate::utils::round_currency;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column names of the forecast table
pub const FORECAST_HEADER: [&str; 4] = ["period", "forecast", "lower", "upper"];

#[derive(Debug, Serialize)]
struct ForecastRow {
    period: String,
    forecast: i64,
    lower: i64,
    upper: i64,
}

impl From<&ForecastPoint> for ForecastRow {
    fn from(point: &ForecastPoint) -> Self {
        Self {
            period: point.timestamp.format("%Y-%m-%d").to_string(),
            forecast: round_currency(point.point),
            lower: round_currency(point.lower),
            upper: round_currency(point.upper),
        }
    }
}

/// Write the forecast table: one header row, then one row per step with values
/// rounded to whole currency units
pub fn write_forecast_csv<W: Write>(writer: W, points: &[ForecastPoint]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(FORECAST_HEADER)?;
    for point in points {
        csv_writer.serialize(ForecastRow::from(point))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render the forecast table as a string
pub fn forecast_csv_string(points: &[ForecastPoint]) -> Result<String> {
    let mut buffer = Vec::new();
    write_forecast_csv(&mut buffer, points)?;
    String::from_utf8(buffer).map_err(|e| ForecastError::InvalidParameter(e.to_string()))
}

/// Write the forecast table to a file
pub fn export_forecast_csv<P: AsRef<Path>>(path: P, points: &[ForecastPoint]) -> Result<()> {
    let file = File::create(path)?;
    write_forecast_csv(file, points)
}
