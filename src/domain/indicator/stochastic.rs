//! Stochastic oscillator.
//!
//! %K = 100 * (close - lowest low) / (highest high - lowest low) over n bars.
//! A flat window (highest == lowest) gives %K = 50.
//! %D = SMA(signal) of %K.
//! A point is emitted only once both %K and %D exist.

use serde::Serialize;

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;
use crate::domain::indicator::sma::sma_of_optional;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StochasticPoint {
    pub k: f64,
    pub d: f64,
}

pub fn calculate_stochastic(
    candles: &[Candle],
    period: usize,
    signal: usize,
) -> Result<Vec<Option<StochasticPoint>>, TradebenchError> {
    let t = IndicatorType::Stochastic { period, signal };
    check_period(t, "period", period)?;
    check_period(t, "signal", signal)?;
    check_len(t, candles.len())?;

    let k_line: Vec<Option<f64>> = (0..candles.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &candles[i + 1 - period..=i];
            let hh = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let ll = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            let range = hh - ll;
            Some(if range > 0.0 {
                100.0 * (candles[i].close - ll) / range
            } else {
                50.0
            })
        })
        .collect();

    let d_line = sma_of_optional(&k_line, signal);

    Ok(k_line
        .into_iter()
        .zip(d_line)
        .map(|(k, d)| Some(StochasticPoint { k: k?, d: d? }))
        .collect())
}
