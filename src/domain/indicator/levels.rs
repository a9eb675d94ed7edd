//! Support and resistance from swing pivots.
//!
//! A pivot high at bar j has a high strictly above the `window` bars before
//! it and at or above the `window` bars after it; pivot lows mirror this.
//! A pivot is only known `window` bars after it forms, so bar i sees pivots
//! with j + window <= i. No future bars are read.
//!
//! Per bar: support is the highest confirmed pivot low below the close,
//! resistance the lowest confirmed pivot high above it, both limited to
//! pivots formed within the last `lookback` bars.

use serde::Serialize;

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, check_period, IndicatorType};

/// Relative distance under which two key levels are merged.
pub const MERGE_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Levels {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pivot {
    High(f64),
    Low(f64),
}

fn pivot_at(candles: &[Candle], j: usize, window: usize) -> Option<Pivot> {
    if j < window || j + window >= candles.len() {
        return None;
    }
    let c = &candles[j];
    let left = &candles[j - window..j];
    let right = &candles[j + 1..=j + window];

    let is_high = left.iter().all(|o| c.high > o.high) && right.iter().all(|o| c.high >= o.high);
    let is_low = left.iter().all(|o| c.low < o.low) && right.iter().all(|o| c.low <= o.low);
    match (is_high, is_low) {
        (true, false) => Some(Pivot::High(c.high)),
        (false, true) => Some(Pivot::Low(c.low)),
        // An outside bar that is both is ambiguous; ignore it.
        _ => None,
    }
}

pub fn calculate_levels(
    candles: &[Candle],
    window: usize,
    lookback: usize,
) -> Result<Vec<Option<Levels>>, TradebenchError> {
    let t = IndicatorType::Levels { window, lookback };
    check_period(t, "window", window)?;
    check_period(t, "lookback", lookback)?;
    if lookback < window {
        return Err(TradebenchError::invalid_parameter(
            "lookback",
            format!("{} must be at least the pivot window {}", lookback, window),
        ));
    }
    check_len(t, candles.len())?;

    let pivots: Vec<Option<Pivot>> = (0..candles.len())
        .map(|j| pivot_at(candles, j, window))
        .collect();

    let mut out = vec![None; candles.len()];
    for i in (2 * window)..candles.len() {
        let close = candles[i].close;
        let newest = i - window;
        let oldest = i.saturating_sub(lookback);
        let mut support: Option<f64> = None;
        let mut resistance: Option<f64> = None;
        for pivot in pivots[oldest..=newest].iter().flatten() {
            match *pivot {
                Pivot::Low(p) if p < close => {
                    support = Some(support.map_or(p, |s| s.max(p)));
                }
                Pivot::High(p) if p > close => {
                    resistance = Some(resistance.map_or(p, |r| r.min(p)));
                }
                _ => {}
            }
        }
        out[i] = Some(Levels {
            support,
            resistance,
        });
    }
    Ok(out)
}

/// All swing levels of a whole series, sorted ascending and merged.
pub fn find_key_levels(candles: &[Candle], window: usize) -> Result<KeyLevels, TradebenchError> {
    let t = IndicatorType::Levels {
        window,
        lookback: candles.len(),
    };
    check_period(t, "window", window)?;
    check_len(t, candles.len())?;

    let mut support = Vec::new();
    let mut resistance = Vec::new();
    for j in 0..candles.len() {
        match pivot_at(candles, j, window) {
            Some(Pivot::Low(p)) => support.push(p),
            Some(Pivot::High(p)) => resistance.push(p),
            None => {}
        }
    }
    Ok(KeyLevels {
        support: merge_levels(support),
        resistance: merge_levels(resistance),
    })
}

fn merge_levels(mut levels: Vec<f64>) -> Vec<f64> {
    levels.sort_by(f64::total_cmp);
    let mut merged: Vec<f64> = Vec::with_capacity(levels.len());
    for level in levels {
        match merged.last() {
            Some(&last) if (level - last).abs() <= last.abs() * MERGE_TOLERANCE => {}
            _ => merged.push(level),
        }
    }
    merged
}
