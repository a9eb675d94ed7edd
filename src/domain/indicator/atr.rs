//! Average True Range.
//!
//! TR[0] = high - low; TR[i] = max(H-L, |H-prevC|, |L-prevC|).
//! Seeded by the mean of the first n true ranges, then Wilder smoothing:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) entries are absent.

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_atr(candles: &[Candle], period: usize) -> Result<Vec<Option<f64>>, TradebenchError> {
    let t = IndicatorType::Atr(period);
    check_period(t, "period", period)?;
    check_len(t, candles.len())?;

    let tr_values = true_ranges(candles);
    let mut out = vec![None; candles.len()];

    let mut atr = tr_values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(atr);
    for i in period..candles.len() {
        atr = (atr * (period - 1) as f64 + tr_values[i]) / period as f64;
        out[i] = Some(atr);
    }
    Ok(out)
}

pub(crate) fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                c.range()
            } else {
                c.true_range(candles[i - 1].close)
            }
        })
        .collect()
}
