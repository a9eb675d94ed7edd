//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (k × StdDev)
//! - Lower: Middle - (k × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, k=2.0
//! Warmup: first (period-1) entries are absent.

use serde::Serialize;

use crate::domain::error::TradebenchError;
use crate::domain::indicator::stddev::window_stats;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerPoint {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Key used to store a band multiplier inside `IndicatorType`.
pub fn k_to_x100(k: f64) -> u32 {
    (k * 100.0).round().max(0.0) as u32
}

pub fn calculate_bollinger(
    values: &[f64],
    period: usize,
    k: f64,
) -> Result<Vec<Option<BollingerPoint>>, TradebenchError> {
    let t = IndicatorType::Bollinger {
        period,
        k_x100: k_to_x100(k),
    };
    check_period(t, "period", period)?;
    if !k.is_finite() || k <= 0.0 {
        return Err(TradebenchError::invalid_parameter(
            format!("{t}.k"),
            "band multiplier must be positive",
        ));
    }
    check_len(t, values.len())?;

    Ok(window_stats(values, period)
        .into_iter()
        .map(|w| {
            w.map(|(middle, sd)| BollingerPoint {
                upper: middle + k * sd,
                middle,
                lower: middle - k * sd,
            })
        })
        .collect())
}
