//! Trend summary from the last close against 20/50/200-bar SMAs.

use serde::Serialize;

use crate::domain::candle::Candle;
use crate::domain::indicator::sma::calculate_sma;

pub const SHORT_PERIOD: usize = 20;
pub const MEDIUM_PERIOD: usize = 50;
pub const LONG_PERIOD: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendBias {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendSummary {
    pub short: Option<TrendBias>,
    pub medium: Option<TrendBias>,
    pub long: Option<TrendBias>,
}

/// `None` for any horizon the series is too short to cover.
pub fn summarize_trend(candles: &[Candle]) -> TrendSummary {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let last = closes.last().copied();
    let bias = |period: usize| -> Option<TrendBias> {
        let close = last?;
        let sma = calculate_sma(&closes, period).ok()?.last().copied().flatten()?;
        Some(if close > sma {
            TrendBias::Bullish
        } else {
            TrendBias::Bearish
        })
    };
    TrendSummary {
        short: bias(SHORT_PERIOD),
        medium: bias(MEDIUM_PERIOD),
        long: bias(LONG_PERIOD),
    }
}
