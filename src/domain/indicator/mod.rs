//! Technical indicator library.
//!
//! Every indicator is a pure function over price/volume slices returning a
//! vector aligned by index with its input. Entries inside the warm-up window
//! are `None`, never a silent zero. Inputs shorter than the warm-up fail with
//! [`TradebenchError::InsufficientData`]; a zero period fails with
//! [`TradebenchError::InvalidParameter`].
//!
//! This module also provides the types used to carry computed indicators
//! through a backtest:
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorValue`: the value shape of one indicator at one bar
//! - `IndicatorSeries`: one indicator aligned to a candle series
//! - `IndicatorSet`: every indicator a run needs, computed once

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod levels;
pub mod macd;
pub mod patterns;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod trend;
pub mod volume;

pub use adx::{calculate_adx, AdxPoint};
pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerPoint};
pub use ema::calculate_ema;
pub use levels::{calculate_levels, find_key_levels, KeyLevels, Levels};
pub use macd::{calculate_macd, MacdPoint};
pub use patterns::{detect_patterns, CandlePattern, PatternBias, PatternFlags};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;
pub use stochastic::{calculate_stochastic, StochasticPoint};
pub use trend::{summarize_trend, TrendBias, TrendSummary};
pub use volume::{classify_volume_trend, VolumeTrend};

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::domain::candle::{closes, volumes, Candle};
use crate::domain::error::TradebenchError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum IndicatorValue {
    Simple(f64),
    Macd(MacdPoint),
    Bollinger(BollingerPoint),
    Stochastic(StochasticPoint),
    Adx(AdxPoint),
    Levels(Levels),
    Patterns(PatternFlags),
    VolumeTrend(VolumeTrend),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        k_x100: u32,
    },
    Stddev(usize),
    Atr(usize),
    Stochastic {
        period: usize,
        signal: usize,
    },
    Adx(usize),
    Levels {
        window: usize,
        lookback: usize,
    },
    Patterns,
    VolumeTrend(usize),
}

impl IndicatorType {
    /// Minimum number of bars before the first valid value.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Stddev(p)
            | IndicatorType::Atr(p) => p,
            IndicatorType::Rsi(p) => p + 1,
            IndicatorType::Macd { slow, signal, .. } => (slow + signal).saturating_sub(1),
            IndicatorType::Bollinger { period, .. } => period,
            IndicatorType::Stochastic { period, signal } => (period + signal).saturating_sub(1),
            IndicatorType::Adx(p) => 2 * p,
            IndicatorType::Levels { window, .. } => 2 * window + 1,
            IndicatorType::Patterns => 1,
            IndicatorType::VolumeTrend(p) => 2 * p,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger { period, k_x100 } => {
                let k = *k_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, k)
            }
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Stochastic { period, signal } => {
                write!(f, "STOCHASTIC({},{})", period, signal)
            }
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Levels { window, lookback } => {
                write!(f, "LEVELS({},{})", window, lookback)
            }
            IndicatorType::Patterns => write!(f, "PATTERNS"),
            IndicatorType::VolumeTrend(period) => write!(f, "VOLUME_TREND({})", period),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<IndicatorValue>>,
}

impl IndicatorSeries {
    fn from_points<T>(
        indicator_type: IndicatorType,
        points: Vec<Option<T>>,
        wrap: impl Fn(T) -> IndicatorValue,
    ) -> Self {
        IndicatorSeries {
            indicator_type,
            values: points.into_iter().map(|p| p.map(&wrap)).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&IndicatorValue> {
        self.values.get(index).and_then(|v| v.as_ref())
    }
}

/// Compute a single indicator over a candle series.
pub fn compute_indicator(
    candles: &[Candle],
    indicator_type: IndicatorType,
) -> Result<IndicatorSeries, TradebenchError> {
    let t = indicator_type;
    let series = match t {
        IndicatorType::Sma(p) => {
            IndicatorSeries::from_points(t, calculate_sma(&closes(candles), p)?, IndicatorValue::Simple)
        }
        IndicatorType::Ema(p) => {
            IndicatorSeries::from_points(t, calculate_ema(&closes(candles), p)?, IndicatorValue::Simple)
        }
        IndicatorType::Rsi(p) => {
            IndicatorSeries::from_points(t, calculate_rsi(&closes(candles), p)?, IndicatorValue::Simple)
        }
        IndicatorType::Macd { fast, slow, signal } => IndicatorSeries::from_points(
            t,
            calculate_macd(&closes(candles), fast, slow, signal)?,
            IndicatorValue::Macd,
        ),
        IndicatorType::Bollinger { period, k_x100 } => IndicatorSeries::from_points(
            t,
            calculate_bollinger(&closes(candles), period, k_x100 as f64 / 100.0)?,
            IndicatorValue::Bollinger,
        ),
        IndicatorType::Stddev(p) => IndicatorSeries::from_points(
            t,
            calculate_stddev(&closes(candles), p)?,
            IndicatorValue::Simple,
        ),
        IndicatorType::Atr(p) => {
            IndicatorSeries::from_points(t, calculate_atr(candles, p)?, IndicatorValue::Simple)
        }
        IndicatorType::Stochastic { period, signal } => IndicatorSeries::from_points(
            t,
            calculate_stochastic(candles, period, signal)?,
            IndicatorValue::Stochastic,
        ),
        IndicatorType::Adx(p) => {
            IndicatorSeries::from_points(t, calculate_adx(candles, p)?, IndicatorValue::Adx)
        }
        IndicatorType::Levels { window, lookback } => IndicatorSeries::from_points(
            t,
            calculate_levels(candles, window, lookback)?,
            IndicatorValue::Levels,
        ),
        IndicatorType::Patterns => {
            IndicatorSeries::from_points(t, detect_patterns(candles)?, IndicatorValue::Patterns)
        }
        IndicatorType::VolumeTrend(p) => IndicatorSeries::from_points(
            t,
            classify_volume_trend(&volumes(candles), p)?,
            IndicatorValue::VolumeTrend,
        ),
    };
    Ok(series)
}

/// All indicators needed by one run, computed once up front.
///
/// Each indicator is computed independently: one failing (e.g. a series too
/// short for its warm-up) does not prevent the others from succeeding.
#[derive(Debug, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
    failures: Vec<(IndicatorType, TradebenchError)>,
}

impl IndicatorSet {
    pub fn compute(candles: &[Candle], types: &[IndicatorType]) -> Self {
        let mut set = IndicatorSet::default();
        for &t in types {
            if set.series.contains_key(&t) || set.failures.iter().any(|(f, _)| *f == t) {
                continue;
            }
            match compute_indicator(candles, t) {
                Ok(series) => {
                    set.series.insert(t, series);
                }
                Err(e) => {
                    tracing::debug!(indicator = %t, error = %e, "indicator computation failed");
                    set.failures.push((t, e));
                }
            }
        }
        set
    }

    /// Fail with the first recorded indicator failure, if any.
    pub fn into_complete(mut self) -> Result<Self, TradebenchError> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            let (_, err) = self.failures.remove(0);
            Err(err)
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&IndicatorType, &TradebenchError)> {
        self.failures.iter().map(|(t, e)| (t, e))
    }

    pub fn series(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    pub fn value(&self, indicator_type: &IndicatorType, index: usize) -> Option<&IndicatorValue> {
        self.series.get(indicator_type)?.get(index)
    }

    pub fn simple(&self, indicator_type: &IndicatorType, index: usize) -> Option<f64> {
        match self.value(indicator_type, index)? {
            IndicatorValue::Simple(v) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

pub(crate) fn check_period(
    indicator: IndicatorType,
    name: &str,
    period: usize,
) -> Result<(), TradebenchError> {
    if period == 0 {
        return Err(TradebenchError::invalid_parameter(
            format!("{indicator}.{name}"),
            "period must be positive",
        ));
    }
    Ok(())
}

pub(crate) fn check_len(indicator: IndicatorType, have: usize) -> Result<(), TradebenchError> {
    let need = indicator.warmup();
    if have < need {
        return Err(TradebenchError::InsufficientData {
            indicator: indicator.to_string(),
            have,
            need,
        });
    }
    Ok(())
}
