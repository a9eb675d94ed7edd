//! Strategy evaluation.
//!
//! Turns the indicator values at one bar (and the bar before it) into a
//! single signal. Evaluation reads only precomputed indicator arrays, so the
//! same inputs always give the same signal. Any indicator value missing at
//! the bar (warm-up) yields NONE. Ties yield NONE.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    AdxPoint, BollingerPoint, IndicatorSet, IndicatorType, IndicatorValue, Levels, MacdPoint,
    PatternBias, PatternFlags, VolumeTrend,
};
use crate::domain::signal::{Direction, Signal};
use crate::domain::strategy::StrategyKind;

/// Floor for the breakout proximity band.
const EPSILON: f64 = 1e-12;

pub fn evaluate(
    kind: &StrategyKind,
    symbol: &str,
    candles: &[Candle],
    indicators: &IndicatorSet,
    index: usize,
) -> Signal {
    let Some(candle) = candles.get(index) else {
        return Signal::none(chrono::NaiveDateTime::MIN, symbol, 0.0);
    };
    let none = || Signal::none(candle.timestamp, symbol, candle.close);
    let signal = match *kind {
        StrategyKind::EmaCrossover {
            short_period,
            long_period,
            rsi_period,
            overbought,
            oversold,
        } => ema_crossover(
            indicators,
            index,
            EmaRule {
                short: IndicatorType::Ema(short_period),
                long: IndicatorType::Ema(long_period),
                rsi: IndicatorType::Rsi(rsi_period),
                overbought,
                oversold,
            },
            candle,
            symbol,
        ),
        StrategyKind::BollingerReversion {
            rsi_period,
            overbought,
            oversold,
            ..
        } => bollinger_reversion(
            indicators,
            index,
            kind,
            IndicatorType::Rsi(rsi_period),
            (overbought, oversold),
            candle,
            symbol,
        ),
        StrategyKind::Breakout { proximity, .. } => {
            breakout(indicators, index, kind, proximity, candle, symbol)
        }
        StrategyKind::TrendFollowing {
            adx_threshold,
            adx_ceiling,
            ..
        } => trend_following(
            indicators,
            index,
            kind,
            (adx_threshold, adx_ceiling),
            candle,
            symbol,
        ),
        StrategyKind::PatternVolume { lookback, .. } => {
            pattern_volume(indicators, index, kind, lookback, candle, symbol)
        }
    };
    signal.unwrap_or_else(none)
}

struct EmaRule {
    short: IndicatorType,
    long: IndicatorType,
    rsi: IndicatorType,
    overbought: f64,
    oversold: f64,
}

fn ema_crossover(
    set: &IndicatorSet,
    i: usize,
    p: EmaRule,
    candle: &Candle,
    symbol: &str,
) -> Option<Signal> {
    let short = set.simple(&p.short, i)?;
    let long = set.simple(&p.long, i)?;
    let rsi = set.simple(&p.rsi, i)?;

    let (direction, confidence) = if short > long && rsi < p.overbought {
        (Direction::Long, 0.7 + if rsi < p.oversold { 0.2 } else { 0.0 })
    } else if short < long && rsi > p.oversold {
        (Direction::Short, 0.7 + if rsi > p.overbought { 0.2 } else { 0.0 })
    } else {
        (Direction::None, 0.0)
    };

    let flipped = previous(i).and_then(|j| {
        let prev = set.simple(&p.short, j)? - set.simple(&p.long, j)?;
        Some(prev.partial_cmp(&0.0) != (short - long).partial_cmp(&0.0))
    });

    let mut signal = Signal::new(candle.timestamp, symbol, direction, candle.close, confidence)
        .with_meta("indicator", format!("{}/{}", p.short, p.long))
        .with_meta("short_ema", short)
        .with_meta("long_ema", long)
        .with_meta("rsi", rsi);
    if let Some(flipped) = flipped {
        signal = signal.with_meta("crossover", flipped);
    }
    Some(signal)
}

fn bollinger_reversion(
    set: &IndicatorSet,
    i: usize,
    kind: &StrategyKind,
    rsi_type: IndicatorType,
    (overbought, oversold): (f64, f64),
    candle: &Candle,
    symbol: &str,
) -> Option<Signal> {
    let band_type = *kind.required_indicators().first()?;
    let bands: BollingerPoint = match set.value(&band_type, i)? {
        IndicatorValue::Bollinger(b) => *b,
        _ => return None,
    };
    let rsi = set.simple(&rsi_type, i)?;
    let price = candle.close;

    let (direction, confidence) = if price < bands.lower && rsi < oversold {
        (Direction::Long, 0.8)
    } else if price > bands.upper && rsi > overbought {
        (Direction::Short, 0.8)
    } else {
        (Direction::None, 0.0)
    };

    Some(
        Signal::new(candle.timestamp, symbol, direction, price, confidence)
            .with_meta("indicator", band_type)
            .with_meta("upper", bands.upper)
            .with_meta("middle", bands.middle)
            .with_meta("lower", bands.lower)
            .with_meta("rsi", rsi),
    )
}

fn breakout(
    set: &IndicatorSet,
    i: usize,
    kind: &StrategyKind,
    proximity: f64,
    candle: &Candle,
    symbol: &str,
) -> Option<Signal> {
    let required = kind.required_indicators();
    let (atr_type, levels_type) = (*required.first()?, *required.get(1)?);
    let atr = set.simple(&atr_type, i)?;
    let levels: Levels = match set.value(&levels_type, i)? {
        IndicatorValue::Levels(l) => *l,
        _ => return None,
    };
    let price = candle.close;
    let band = (proximity * atr).max(EPSILON);
    let confidence_for = |distance: f64| {
        let normalized = (distance / band).clamp(0.0, 1.0);
        0.6 + 0.2 * (1.0 - normalized)
    };

    let near_support = levels
        .support
        .map(|s| price - s)
        .filter(|d| *d < band);
    let near_resistance = levels
        .resistance
        .map(|r| r - price)
        .filter(|d| *d < band);

    let (direction, confidence) = match (near_support, near_resistance) {
        (Some(d), _) => (Direction::Long, confidence_for(d)),
        (None, Some(d)) => (Direction::Short, confidence_for(d)),
        (None, None) => (Direction::None, 0.0),
    };

    let mut signal = Signal::new(candle.timestamp, symbol, direction, price, confidence)
        .with_meta("indicator", levels_type)
        .with_meta("atr", atr);
    if let Some(s) = levels.support {
        signal = signal.with_meta("support", s);
    }
    if let Some(r) = levels.resistance {
        signal = signal.with_meta("resistance", r);
    }
    Some(signal)
}

fn trend_following(
    set: &IndicatorSet,
    i: usize,
    kind: &StrategyKind,
    (threshold, ceiling): (f64, f64),
    candle: &Candle,
    symbol: &str,
) -> Option<Signal> {
    let required = kind.required_indicators();
    let (macd_type, adx_type) = (*required.first()?, *required.get(1)?);
    let macd_at = |j: usize| -> Option<MacdPoint> {
        match set.value(&macd_type, j)? {
            IndicatorValue::Macd(m) => Some(*m),
            _ => None,
        }
    };
    let macd = macd_at(i)?;
    let adx: AdxPoint = match set.value(&adx_type, i)? {
        IndicatorValue::Adx(a) => *a,
        _ => return None,
    };

    let strength = 0.5 + (adx.adx.min(ceiling) - threshold) / (2.0 * (ceiling - threshold));
    let (direction, confidence) = if adx.adx > threshold && macd.histogram > 0.0 {
        (Direction::Long, strength)
    } else if adx.adx > threshold && macd.histogram < 0.0 {
        (Direction::Short, strength)
    } else {
        (Direction::None, 0.0)
    };

    let flipped = previous(i)
        .and_then(macd_at)
        .map(|prev| prev.histogram.partial_cmp(&0.0) != macd.histogram.partial_cmp(&0.0));

    let mut signal = Signal::new(candle.timestamp, symbol, direction, candle.close, confidence)
        .with_meta("indicator", macd_type)
        .with_meta("histogram", macd.histogram)
        .with_meta("adx", adx.adx)
        .with_meta("plus_di", adx.plus_di)
        .with_meta("minus_di", adx.minus_di);
    if let Some(flipped) = flipped {
        signal = signal.with_meta("crossover", flipped);
    }
    Some(signal)
}

fn pattern_volume(
    set: &IndicatorSet,
    i: usize,
    kind: &StrategyKind,
    lookback: usize,
    candle: &Candle,
    symbol: &str,
) -> Option<Signal> {
    let required = kind.required_indicators();
    let (patterns_type, volume_type) = (*required.first()?, *required.get(1)?);
    let volume = match set.value(&volume_type, i)? {
        IndicatorValue::VolumeTrend(v) => *v,
        _ => return None,
    };

    let start = (i + 1).saturating_sub(lookback);
    let window: Vec<PatternFlags> = (start..=i)
        .filter_map(|j| match set.value(&patterns_type, j) {
            Some(IndicatorValue::Patterns(f)) => Some(*f),
            _ => None,
        })
        .collect();
    let bullish: usize = window.iter().map(|f| f.count_bias(PatternBias::Bullish)).sum();
    let bearish: usize = window.iter().map(|f| f.count_bias(PatternBias::Bearish)).sum();

    let increasing = volume == VolumeTrend::Increasing;
    let confidence_for = |count: usize| (0.5 + 0.1 * count as f64).min(1.0);
    let (direction, confidence) = if increasing && bullish > bearish {
        (Direction::Long, confidence_for(bullish))
    } else if increasing && bearish > bullish {
        (Direction::Short, confidence_for(bearish))
    } else {
        (Direction::None, 0.0)
    };

    Some(
        Signal::new(candle.timestamp, symbol, direction, candle.close, confidence)
            .with_meta("indicator", patterns_type)
            .with_meta("bullish_patterns", bullish)
            .with_meta("bearish_patterns", bearish)
            .with_meta("volume_trend", format!("{:?}", volume).to_lowercase()),
    )
}

fn previous(i: usize) -> Option<usize> {
    i.checked_sub(1)
}
