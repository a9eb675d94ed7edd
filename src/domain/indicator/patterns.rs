//! Candlestick pattern detection.
//!
//! Fixed thresholds:
//! - Doji: body <= 10% of the bar range
//! - Hammer: lower shadow >= 2 x body, upper shadow <= body, not a doji
//! - Shooting star: upper shadow >= 2 x body, lower shadow <= body, not a doji
//! - Bullish engulfing: bearish bar followed by a bullish bar whose body
//!   covers the previous body and is larger than it
//! - Bearish engulfing: the mirror image
//!
//! A bar with zero range carries no pattern.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;
use crate::domain::indicator::{check_len, IndicatorType};

pub const DOJI_BODY_RATIO: f64 = 0.1;
pub const SHADOW_BODY_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandlePattern {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternBias {
    Bullish,
    Bearish,
    Neutral,
}

impl CandlePattern {
    pub const ALL: [CandlePattern; 5] = [
        CandlePattern::Doji,
        CandlePattern::Hammer,
        CandlePattern::ShootingStar,
        CandlePattern::BullishEngulfing,
        CandlePattern::BearishEngulfing,
    ];

    pub fn bias(self) -> PatternBias {
        match self {
            CandlePattern::Doji => PatternBias::Neutral,
            CandlePattern::Hammer | CandlePattern::BullishEngulfing => PatternBias::Bullish,
            CandlePattern::ShootingStar | CandlePattern::BearishEngulfing => PatternBias::Bearish,
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of patterns present on one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags(u8);

impl PatternFlags {
    pub fn empty() -> Self {
        PatternFlags(0)
    }

    pub fn insert(&mut self, pattern: CandlePattern) {
        self.0 |= pattern.bit();
    }

    pub fn contains(&self, pattern: CandlePattern) -> bool {
        self.0 & pattern.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = CandlePattern> + '_ {
        CandlePattern::ALL.into_iter().filter(|p| self.contains(*p))
    }

    pub fn count_bias(&self, bias: PatternBias) -> usize {
        self.iter().filter(|p| p.bias() == bias).count()
    }
}

impl FromIterator<CandlePattern> for PatternFlags {
    fn from_iter<I: IntoIterator<Item = CandlePattern>>(iter: I) -> Self {
        let mut flags = PatternFlags::empty();
        for p in iter {
            flags.insert(p);
        }
        flags
    }
}

impl Serialize for PatternFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for p in self.iter() {
            seq.serialize_element(&p)?;
        }
        seq.end()
    }
}

pub fn detect_patterns(candles: &[Candle]) -> Result<Vec<Option<PatternFlags>>, TradebenchError> {
    check_len(IndicatorType::Patterns, candles.len())?;
    Ok((0..candles.len())
        .map(|i| {
            let prev = if i > 0 { Some(&candles[i - 1]) } else { None };
            Some(patterns_at(&candles[i], prev))
        })
        .collect())
}

fn patterns_at(c: &Candle, prev: Option<&Candle>) -> PatternFlags {
    let mut flags = PatternFlags::empty();
    let range = c.range();
    if range <= 0.0 {
        return flags;
    }

    let body = c.body();
    let doji = body <= DOJI_BODY_RATIO * range;
    if doji {
        flags.insert(CandlePattern::Doji);
    } else {
        if c.lower_shadow() >= SHADOW_BODY_RATIO * body && c.upper_shadow() <= body {
            flags.insert(CandlePattern::Hammer);
        }
        if c.upper_shadow() >= SHADOW_BODY_RATIO * body && c.lower_shadow() <= body {
            flags.insert(CandlePattern::ShootingStar);
        }
    }

    if let Some(p) = prev {
        let larger = body > p.body();
        if p.is_bearish() && c.is_bullish() && c.open <= p.close && c.close >= p.open && larger {
            flags.insert(CandlePattern::BullishEngulfing);
        }
        if p.is_bullish() && c.is_bearish() && c.open >= p.close && c.close <= p.open && larger {
            flags.insert(CandlePattern::BearishEngulfing);
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;

    fn single(o: f64, h: f64, l: f64, c: f64) -> PatternFlags {
        detect_patterns(&[candle(0, o, h, l, c)]).unwrap()[0].unwrap()
    }

    #[test]
    fn doji() {
        let flags = single(10.0, 11.0, 9.0, 10.1);
        assert!(flags.contains(CandlePattern::Doji));
        assert!(!flags.contains(CandlePattern::Hammer));
    }

    #[test]
    fn hammer() {
        // body 0.5, lower shadow 2.0, upper shadow 0.1
        let flags = single(10.0, 10.6, 8.0, 10.5);
        assert!(flags.contains(CandlePattern::Hammer));
        assert!(!flags.contains(CandlePattern::ShootingStar));
        assert_eq!(flags.count_bias(PatternBias::Bullish), 1);
    }

    #[test]
    fn shooting_star() {
        let flags = single(10.5, 13.0, 9.9, 10.0);
        assert!(flags.contains(CandlePattern::ShootingStar));
        assert_eq!(flags.count_bias(PatternBias::Bearish), 1);
    }

    #[test]
    fn bullish_engulfing() {
        let candles = vec![candle(0, 10.5, 10.6, 9.9, 10.0), candle(1, 9.9, 11.1, 9.8, 11.0)];
        let out = detect_patterns(&candles).unwrap();
        assert!(out[1].unwrap().contains(CandlePattern::BullishEngulfing));
        assert!(!out[0].unwrap().contains(CandlePattern::BullishEngulfing));
    }

    #[test]
    fn bearish_engulfing() {
        let candles = vec![candle(0, 10.0, 10.6, 9.9, 10.5), candle(1, 10.6, 10.7, 9.4, 9.5)];
        let out = detect_patterns(&candles).unwrap();
        assert!(out[1].unwrap().contains(CandlePattern::BearishEngulfing));
    }

    #[test]
    fn same_colour_is_not_engulfing() {
        let candles = vec![candle(0, 10.0, 10.6, 9.9, 10.5), candle(1, 9.9, 11.1, 9.8, 11.0)];
        let out = detect_patterns(&candles).unwrap();
        assert!(!out[1].unwrap().contains(CandlePattern::BullishEngulfing));
    }

    #[test]
    fn zero_range_has_no_pattern() {
        assert!(single(10.0, 10.0, 10.0, 10.0).is_empty());
    }

    #[test]
    fn empty_series_is_insufficient() {
        assert!(matches!(
            detect_patterns(&[]),
            Err(TradebenchError::InsufficientData { have: 0, need: 1, .. })
        ));
    }

    #[test]
    fn flags_serialize_as_names() {
        let flags: PatternFlags = [CandlePattern::Doji, CandlePattern::BearishEngulfing]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#"["doji","bearish_engulfing"]"#);
    }
}
