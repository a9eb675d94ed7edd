//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(values[i-n+1..=i]), computed with a running sum.
//! Warmup: first (n-1) entries are absent.

use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

pub fn calculate_sma(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, TradebenchError> {
    let t = IndicatorType::Sma(period);
    check_period(t, "period", period)?;
    check_len(t, values.len())?;

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    Ok(out)
}

/// SMA over a series that itself has a warm-up prefix of `None`s.
///
/// The window starts at the first present value; gaps after that are not
/// expected and yield `None` for every window that covers them.
pub(crate) fn sma_of_optional(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for i in 0..values.len() {
        if i + 1 < period {
            continue;
        }
        let window = &values[i + 1 - period..=i];
        if window.iter().all(Option::is_some) {
            let sum: f64 = window.iter().flatten().sum();
            out[i] = Some(sum / period as f64);
        }
    }
    out
}
