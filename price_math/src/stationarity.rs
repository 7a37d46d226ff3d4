//! Stationarity checks used to pick differencing orders
//!
//! Contains:
//! - KPSS level-stationarity test with a Bartlett long-run variance
//! - Regular differencing order selection by repeated KPSS tests
//! - Seasonal differencing order selection by seasonal variance reduction

use crate::differencing::{difference, seasonal_difference};
use crate::stats::{detrend, variance};
use crate::{MathError, Result};

/// 5% critical value of the KPSS level-stationarity statistic
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// Seasonal differencing is suggested when it leaves less than this share of
/// the (detrended) variance.
pub const SEASONAL_VARIANCE_RATIO: f64 = 0.7;

/// Result of a KPSS test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpssResult {
    /// Test statistic
    pub statistic: f64,
    /// Bartlett window truncation lag
    pub lags: usize,
    /// Whether the null of level stationarity is kept at 5%
    pub is_stationary: bool,
}

/// KPSS test for level stationarity.
///
/// The truncation lag is `floor(3 * sqrt(n) / 13)`.
pub fn kpss_level(series: &[f64]) -> Result<KpssResult> {
    let n = series.len();
    if n < 3 {
        return Err(MathError::InsufficientData(format!(
            "KPSS test needs at least 3 observations, have {}",
            n
        )));
    }

    let m = series.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = series.iter().map(|v| v - m).collect();
    let lags = ((3.0 * (n as f64).sqrt()) / 13.0).floor() as usize;

    let mut long_run = residuals.iter().map(|e| e * e).sum::<f64>() / n as f64;
    for s in 1..=lags.min(n - 1) {
        let weight = 1.0 - s as f64 / (lags as f64 + 1.0);
        let autocov: f64 = (s..n).map(|t| residuals[t] * residuals[t - s]).sum::<f64>() / n as f64;
        long_run += 2.0 * weight * autocov;
    }

    if long_run <= f64::EPSILON {
        // A constant series is trivially level-stationary
        return Ok(KpssResult {
            statistic: 0.0,
            lags,
            is_stationary: true,
        });
    }

    let mut partial = 0.0;
    let mut sum_sq = 0.0;
    for e in &residuals {
        partial += e;
        sum_sq += partial * partial;
    }

    let statistic = sum_sq / ((n * n) as f64 * long_run);
    Ok(KpssResult {
        statistic,
        lags,
        is_stationary: statistic <= KPSS_CRITICAL_5PCT,
    })
}

/// Smallest `d <= max_d` for which the differenced series passes KPSS
pub fn suggest_differencing(series: &[f64], max_d: usize) -> Result<usize> {
    let mut current = series.to_vec();
    for d in 0..max_d {
        if current.len() < 3 || kpss_level(&current)?.is_stationary {
            return Ok(d);
        }
        current = difference(&current, 1);
    }
    Ok(max_d)
}

/// Seasonal differencing order (0 or 1, capped at `max_big_d`).
///
/// The series is detrended first so a linear trend is not mistaken for
/// seasonality. Needs at least two full periods.
pub fn suggest_seasonal_differencing(series: &[f64], m: usize, max_big_d: usize) -> Result<usize> {
    if max_big_d == 0 || m < 2 || series.len() < 2 * m {
        return Ok(0);
    }

    let detrended = detrend(series)?;
    let base = variance(&detrended, 0)?;
    if base <= f64::EPSILON {
        return Ok(0);
    }

    let seasonal = seasonal_difference(&detrended, 1, m);
    let reduced = variance(&seasonal, 0)?;

    if reduced < SEASONAL_VARIANCE_RATIO * base {
        Ok(1)
    } else {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn noise(n: usize) -> Vec<f64> {
        // Deterministic pseudo-noise
        let mut state: u64 = 42;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5
            })
            .collect()
    }

    #[test]
    fn test_kpss_white_noise_is_stationary() {
        let result = kpss_level(&noise(200)).unwrap();
        assert!(result.is_stationary, "statistic {}", result.statistic);
    }

    #[test]
    fn test_kpss_trend_is_not_stationary() {
        let series: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let result = kpss_level(&series).unwrap();
        assert!(!result.is_stationary);
    }

    #[test]
    fn test_suggest_differencing() {
        let walk: Vec<f64> = noise(200)
            .iter()
            .scan(100.0, |acc, e| {
                *acc += 1.0 + e;
                Some(*acc)
            })
            .collect();

        assert_eq!(suggest_differencing(&noise(200), 2).unwrap(), 0);
        assert_eq!(suggest_differencing(&walk, 2).unwrap(), 1);
        assert_eq!(suggest_differencing(&walk, 0).unwrap(), 0);
    }

    #[test]
    fn test_seasonal_differencing_detects_cycle() {
        let series: Vec<f64> = (0..120)
            .map(|i| 100.0 + 10.0 * (2.0 * PI * i as f64 / 12.0).sin())
            .zip(noise(120))
            .map(|(s, e)| s + e)
            .collect();

        assert_eq!(suggest_seasonal_differencing(&series, 12, 1).unwrap(), 1);
        assert_eq!(suggest_seasonal_differencing(&series, 12, 0).unwrap(), 0);
        assert_eq!(suggest_seasonal_differencing(&noise(120), 12, 1).unwrap(), 0);
    }

    #[test]
    fn test_short_series_skips_seasonal_check() {
        assert_eq!(suggest_seasonal_differencing(&noise(30), 52, 1).unwrap(), 0);
    }
}
