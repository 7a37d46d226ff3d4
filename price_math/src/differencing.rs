//! Differencing operators for integrated time series models
//!
//! Contains:
//! - Regular differencing `(1 - B)^d`
//! - Seasonal differencing `(1 - B^m)^D`

/// Apply `d` regular differences to a series.
///
/// Each pass shortens the series by one observation.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() < 2 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `big_d` seasonal differences with period `m`.
///
/// Each pass shortens the series by `m` observations. A zero period is
/// treated as "no seasonal component".
pub fn seasonal_difference(series: &[f64], big_d: usize, m: usize) -> Vec<f64> {
    if big_d == 0 || m == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..big_d {
        if result.len() <= m {
            return Vec::new();
        }
        result = (m..result.len()).map(|t| result[t] - result[t - m]).collect();
    }
    result
}

/// Apply regular then seasonal differencing
pub fn full_difference(series: &[f64], d: usize, big_d: usize, m: usize) -> Vec<f64> {
    seasonal_difference(&difference(series, d), big_d, m)
}

/// Number of observations consumed by differencing
pub fn differencing_loss(d: usize, big_d: usize, m: usize) -> usize {
    d + big_d * m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference() {
        let series = [1.0, 3.0, 6.0, 10.0];
        assert_eq!(difference(&series, 1), vec![2.0, 3.0, 4.0]);
        assert_eq!(difference(&series, 2), vec![1.0, 1.0]);
        assert_eq!(difference(&series, 0), series.to_vec());
    }

    #[test]
    fn test_seasonal_difference() {
        let series = [1.0, 2.0, 3.0, 2.0, 4.0, 6.0];
        assert_eq!(seasonal_difference(&series, 1, 3), vec![1.0, 2.0, 3.0]);
        assert!(seasonal_difference(&series, 2, 3).is_empty());
    }

    #[test]
    fn test_full_difference_length() {
        let series: Vec<f64> = (0..100).map(|i| (i * i) as f64).collect();
        let w = full_difference(&series, 1, 1, 12);
        assert_eq!(w.len(), 100 - differencing_loss(1, 1, 12));
    }
}
