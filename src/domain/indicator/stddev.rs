//! Standard Deviation indicator.
//!
//! Population standard deviation over n values.
//! STDDEV(n)[i] = sqrt(sum((V[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) entries are absent.

use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

pub fn calculate_stddev(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, TradebenchError> {
    let t = IndicatorType::Stddev(period);
    check_period(t, "period", period)?;
    check_len(t, values.len())?;
    Ok(window_stats(values, period)
        .into_iter()
        .map(|w| w.map(|(_, sd)| sd))
        .collect())
}

/// (mean, population stddev) for every full trailing window.
pub(crate) fn window_stats(values: &[f64], period: usize) -> Vec<Option<(f64, f64)>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            Some((mean, variance.sqrt()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_warmup() {
        let out = calculate_stddev(&[10.0, 20.0, 30.0, 40.0, 50.0], 3).unwrap();
        assert!(out[0].is_none());
        assert!(out[1].is_none());
        assert!(out[2..].iter().all(Option::is_some));
    }

    #[test]
    fn stddev_constant_values() {
        let out = calculate_stddev(&[100.0; 5], 3).unwrap();
        assert!(out[2].unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_basic_calculation() {
        let out = calculate_stddev(&[10.0, 20.0, 30.0], 3).unwrap();
        let sma: f64 = 20.0;
        let expected =
            (((10.0 - sma).powi(2) + (20.0 - sma).powi(2) + (30.0 - sma).powi(2)) / 3.0).sqrt();
        assert!((out[2].unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn stddev_known_values() {
        let out = calculate_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8).unwrap();
        assert!((out[7].unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn stddev_insufficient_data() {
        assert!(matches!(
            calculate_stddev(&[10.0, 20.0, 30.0], 5),
            Err(TradebenchError::InsufficientData { have: 3, need: 5, .. })
        ));
    }
}
