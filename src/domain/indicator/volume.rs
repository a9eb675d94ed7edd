//! Volume trend classification.
//!
//! Compares the mean volume of the last n bars with the mean of the n bars
//! before them. ratio >= 1.10 is increasing, ratio <= 0.90 is decreasing,
//! anything between is flat. A zero prior mean counts as increasing when
//! the recent mean is positive.

use serde::Serialize;

use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

pub const INCREASING_RATIO: f64 = 1.10;
pub const DECREASING_RATIO: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Flat,
}

pub fn classify_volume_trend(
    volumes: &[f64],
    period: usize,
) -> Result<Vec<Option<VolumeTrend>>, TradebenchError> {
    let t = IndicatorType::VolumeTrend(period);
    check_period(t, "period", period)?;
    check_len(t, volumes.len())?;

    let n = period as f64;
    Ok((0..volumes.len())
        .map(|i| {
            if i + 1 < 2 * period {
                return None;
            }
            let recent = volumes[i + 1 - period..=i].iter().sum::<f64>() / n;
            let prior = volumes[i + 1 - 2 * period..i + 1 - period].iter().sum::<f64>() / n;
            Some(classify(recent, prior))
        })
        .collect())
}

fn classify(recent: f64, prior: f64) -> VolumeTrend {
    if prior <= 0.0 {
        return if recent > 0.0 {
            VolumeTrend::Increasing
        } else {
            VolumeTrend::Flat
        };
    }
    let ratio = recent / prior;
    if ratio >= INCREASING_RATIO {
        VolumeTrend::Increasing
    } else if ratio <= DECREASING_RATIO {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_warmup() {
        let out = classify_volume_trend(&[100.0; 6], 3).unwrap();
        assert!(out[4].is_none());
        assert_eq!(out[5], Some(VolumeTrend::Flat));
    }

    #[test]
    fn volume_increasing() {
        let out = classify_volume_trend(&[100.0, 100.0, 150.0, 150.0], 2).unwrap();
        assert_eq!(out[3], Some(VolumeTrend::Increasing));
    }

    #[test]
    fn volume_decreasing() {
        let out = classify_volume_trend(&[100.0, 100.0, 50.0, 50.0], 2).unwrap();
        assert_eq!(out[3], Some(VolumeTrend::Decreasing));
    }

    #[test]
    fn volume_small_change_is_flat() {
        let out = classify_volume_trend(&[100.0, 100.0, 105.0, 105.0], 2).unwrap();
        assert_eq!(out[3], Some(VolumeTrend::Flat));
    }

    #[test]
    fn volume_from_zero() {
        let out = classify_volume_trend(&[0.0, 0.0, 10.0, 0.0], 2).unwrap();
        assert_eq!(out[3], Some(VolumeTrend::Increasing));
        let out = classify_volume_trend(&[0.0; 4], 2).unwrap();
        assert_eq!(out[3], Some(VolumeTrend::Flat));
    }

    #[test]
    fn volume_insufficient_data() {
        assert!(matches!(
            classify_volume_trend(&[1.0; 19], 10),
            Err(TradebenchError::InsufficientData { have: 19, need: 20, .. })
        ));
    }
}
