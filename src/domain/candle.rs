//! OHLCV candle representation and series validation.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::error::TradebenchError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

pub fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}

/// Check the series invariants: strictly increasing timestamps, finite
/// prices, and high/low bracketing open and close.
pub fn validate_series(candles: &[Candle]) -> Result<(), TradebenchError> {
    for (i, c) in candles.iter().enumerate() {
        let prices = [c.open, c.high, c.low, c.close, c.volume];
        if prices.iter().any(|v| !v.is_finite()) {
            return Err(TradebenchError::InvalidSeries {
                index: i,
                reason: "non-finite price or volume".into(),
            });
        }
        if c.high < c.open.max(c.close) {
            return Err(TradebenchError::InvalidSeries {
                index: i,
                reason: format!("high {} below open/close", c.high),
            });
        }
        if c.low > c.open.min(c.close) {
            return Err(TradebenchError::InvalidSeries {
                index: i,
                reason: format!("low {} above open/close", c.low),
            });
        }
        if i > 0 && c.timestamp <= candles[i - 1].timestamp {
            return Err(TradebenchError::InvalidSeries {
                index: i,
                reason: format!(
                    "timestamp {} not after {}",
                    c.timestamp,
                    candles[i - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}
