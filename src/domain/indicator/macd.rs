//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded once the slow EMA exists
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 entries are absent.

use serde::Serialize;

use crate::domain::error::TradebenchError;
use crate::domain::indicator::ema::ema_unchecked;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn calculate_macd(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<Vec<Option<MacdPoint>>, TradebenchError> {
    let t = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    check_period(t, "fast", fast)?;
    check_period(t, "slow", slow)?;
    check_period(t, "signal", signal_period)?;
    if fast >= slow {
        return Err(TradebenchError::invalid_parameter(
            format!("{t}.fast"),
            "fast period must be shorter than slow period",
        ));
    }
    check_len(t, values.len())?;

    let ema_fast = ema_unchecked(values, fast);
    let ema_slow = ema_unchecked(values, slow);

    // The MACD line exists from the first bar where the slow EMA exists.
    let macd_start = slow - 1;
    let macd_line: Vec<f64> = (macd_start..values.len())
        .map(|i| match (ema_fast[i], ema_slow[i]) {
            (Some(f), Some(s)) => f - s,
            _ => 0.0,
        })
        .collect();

    let signal_line = ema_unchecked(&macd_line, signal_period);

    let mut out = vec![None; values.len()];
    for (j, signal) in signal_line.into_iter().enumerate() {
        if let Some(signal) = signal {
            let line = macd_line[j];
            out[macd_start + j] = Some(MacdPoint {
                line,
                signal,
                histogram: line - signal,
            });
        }
    }
    Ok(out)
}

pub fn calculate_macd_default(values: &[f64]) -> Result<Vec<Option<MacdPoint>>, TradebenchError> {
    calculate_macd(values, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
