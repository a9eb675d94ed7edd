//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = V[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) entries are absent.

use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

pub fn calculate_ema(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, TradebenchError> {
    let t = IndicatorType::Ema(period);
    check_period(t, "period", period)?;
    check_len(t, values.len())?;
    Ok(ema_unchecked(values, period))
}

/// EMA without length checks; entries before the seed are `None`.
pub(crate) fn ema_unchecked(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        if i + 1 < period {
            sum += v;
            out.push(None);
        } else if i + 1 == period {
            sum += v;
            ema = sum / period as f64;
            out.push(Some(ema));
        } else {
            ema = v * k + ema * (1.0 - k);
            out.push(Some(ema));
        }
    }
    out
}
