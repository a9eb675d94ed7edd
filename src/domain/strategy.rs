//! Strategy definitions.
//!
//! Each strategy variant carries its own typed parameters and is validated
//! when constructed; an unknown strategy type never reaches evaluation.

use std::fmt;

use serde::Serialize;

use crate::domain::error::TradebenchError;
use crate::domain::indicator::bollinger::k_to_x100;
use crate::domain::indicator::IndicatorType;

/// Position risk settings attached to a strategy. All values are fractions
/// (0.02 = 2%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskParams {
    /// Share of the balance put at risk on one trade.
    pub risk_fraction: f64,
    /// Stop distance from entry.
    pub stop_loss: f64,
    /// Target distance from entry.
    pub take_profit: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            risk_fraction: 0.02,
            stop_loss: 0.02,
            take_profit: 0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    EmaCrossover {
        short_period: usize,
        long_period: usize,
        rsi_period: usize,
        overbought: f64,
        oversold: f64,
    },
    /// `k` is applied with two-decimal precision.
    BollingerReversion {
        period: usize,
        k: f64,
        rsi_period: usize,
        overbought: f64,
        oversold: f64,
    },
    Breakout {
        atr_period: usize,
        level_window: usize,
        level_lookback: usize,
        /// Maximum distance to a level, in ATR multiples.
        proximity: f64,
    },
    TrendFollowing {
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
        adx_period: usize,
        adx_threshold: f64,
        adx_ceiling: f64,
    },
    PatternVolume {
        lookback: usize,
        volume_period: usize,
    },
}

pub const STRATEGY_TYPES: [&str; 5] = [
    "ema_crossover",
    "bollinger_reversion",
    "breakout",
    "trend_following",
    "pattern_volume",
];

impl StrategyKind {
    /// The named variant with its default parameters.
    pub fn from_type(type_name: &str) -> Result<Self, TradebenchError> {
        let kind = match type_name {
            "ema_crossover" => StrategyKind::EmaCrossover {
                short_period: 9,
                long_period: 21,
                rsi_period: 14,
                overbought: 70.0,
                oversold: 30.0,
            },
            "bollinger_reversion" => StrategyKind::BollingerReversion {
                period: 20,
                k: 2.0,
                rsi_period: 14,
                overbought: 70.0,
                oversold: 30.0,
            },
            "breakout" => StrategyKind::Breakout {
                atr_period: 14,
                level_window: 2,
                level_lookback: 50,
                proximity: 0.5,
            },
            "trend_following" => StrategyKind::TrendFollowing {
                fast_period: 12,
                slow_period: 26,
                signal_period: 9,
                adx_period: 14,
                adx_threshold: 25.0,
                adx_ceiling: 50.0,
            },
            "pattern_volume" => StrategyKind::PatternVolume {
                lookback: 5,
                volume_period: 10,
            },
            other => {
                return Err(TradebenchError::invalid_parameter(
                    "strategy.type",
                    format!(
                        "unknown strategy type '{}', expected one of: {}",
                        other,
                        STRATEGY_TYPES.join(", ")
                    ),
                ));
            }
        };
        Ok(kind)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StrategyKind::EmaCrossover { .. } => "ema_crossover",
            StrategyKind::BollingerReversion { .. } => "bollinger_reversion",
            StrategyKind::Breakout { .. } => "breakout",
            StrategyKind::TrendFollowing { .. } => "trend_following",
            StrategyKind::PatternVolume { .. } => "pattern_volume",
        }
    }

    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            StrategyKind::EmaCrossover { .. } => &[
                "short_period",
                "long_period",
                "rsi_period",
                "overbought",
                "oversold",
            ],
            StrategyKind::BollingerReversion { .. } => {
                &["period", "k", "rsi_period", "overbought", "oversold"]
            }
            StrategyKind::Breakout { .. } => {
                &["atr_period", "level_window", "level_lookback", "proximity"]
            }
            StrategyKind::TrendFollowing { .. } => &[
                "fast_period",
                "slow_period",
                "signal_period",
                "adx_period",
                "adx_threshold",
                "adx_ceiling",
            ],
            StrategyKind::PatternVolume { .. } => &["lookback", "volume_period"],
        }
    }

    /// Indicators the evaluator reads for this variant.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match *self {
            StrategyKind::EmaCrossover {
                short_period,
                long_period,
                rsi_period,
                ..
            } => vec![
                IndicatorType::Ema(short_period),
                IndicatorType::Ema(long_period),
                IndicatorType::Rsi(rsi_period),
            ],
            StrategyKind::BollingerReversion {
                period,
                k,
                rsi_period,
                ..
            } => vec![
                IndicatorType::Bollinger {
                    period,
                    k_x100: k_to_x100(k),
                },
                IndicatorType::Rsi(rsi_period),
            ],
            StrategyKind::Breakout {
                atr_period,
                level_window,
                level_lookback,
                ..
            } => vec![
                IndicatorType::Atr(atr_period),
                IndicatorType::Levels {
                    window: level_window,
                    lookback: level_lookback,
                },
            ],
            StrategyKind::TrendFollowing {
                fast_period,
                slow_period,
                signal_period,
                adx_period,
                ..
            } => vec![
                IndicatorType::Macd {
                    fast: fast_period,
                    slow: slow_period,
                    signal: signal_period,
                },
                IndicatorType::Adx(adx_period),
            ],
            StrategyKind::PatternVolume { volume_period, .. } => vec![
                IndicatorType::Patterns,
                IndicatorType::VolumeTrend(volume_period),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), TradebenchError> {
        match *self {
            StrategyKind::EmaCrossover {
                short_period,
                long_period,
                rsi_period,
                overbought,
                oversold,
            } => {
                positive_period("short_period", short_period)?;
                positive_period("long_period", long_period)?;
                positive_period("rsi_period", rsi_period)?;
                if short_period >= long_period {
                    return Err(TradebenchError::invalid_parameter(
                        "short_period",
                        "must be less than long_period",
                    ));
                }
                rsi_thresholds(overbought, oversold)
            }
            StrategyKind::BollingerReversion {
                period,
                k,
                rsi_period,
                overbought,
                oversold,
            } => {
                positive_period("period", period)?;
                positive_period("rsi_period", rsi_period)?;
                if !k.is_finite() || k_to_x100(k) == 0 {
                    return Err(TradebenchError::invalid_parameter(
                        "k",
                        "must be a positive number of at least 0.01",
                    ));
                }
                rsi_thresholds(overbought, oversold)
            }
            StrategyKind::Breakout {
                atr_period,
                level_window,
                level_lookback,
                proximity,
            } => {
                positive_period("atr_period", atr_period)?;
                positive_period("level_window", level_window)?;
                positive_period("level_lookback", level_lookback)?;
                if level_lookback < level_window {
                    return Err(TradebenchError::invalid_parameter(
                        "level_lookback",
                        "must be at least level_window",
                    ));
                }
                if !proximity.is_finite() || proximity <= 0.0 {
                    return Err(TradebenchError::invalid_parameter(
                        "proximity",
                        "must be positive",
                    ));
                }
                Ok(())
            }
            StrategyKind::TrendFollowing {
                fast_period,
                slow_period,
                signal_period,
                adx_period,
                adx_threshold,
                adx_ceiling,
            } => {
                positive_period("fast_period", fast_period)?;
                positive_period("slow_period", slow_period)?;
                positive_period("signal_period", signal_period)?;
                positive_period("adx_period", adx_period)?;
                if fast_period >= slow_period {
                    return Err(TradebenchError::invalid_parameter(
                        "fast_period",
                        "must be less than slow_period",
                    ));
                }
                let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
                if !in_range(adx_threshold) || !in_range(adx_ceiling) || adx_threshold >= adx_ceiling {
                    return Err(TradebenchError::invalid_parameter(
                        "adx_threshold",
                        "need 0 <= adx_threshold < adx_ceiling <= 100",
                    ));
                }
                Ok(())
            }
            StrategyKind::PatternVolume {
                lookback,
                volume_period,
            } => {
                positive_period("lookback", lookback)?;
                positive_period("volume_period", volume_period)
            }
        }
    }

    /// Set one named parameter in place. Validation is left to the caller.
    fn set(&mut self, name: &str, value: f64) -> Result<(), TradebenchError> {
        let type_name = self.type_name();
        match self {
            StrategyKind::EmaCrossover {
                short_period,
                long_period,
                rsi_period,
                overbought,
                oversold,
            } => match name {
                "short_period" => *short_period = as_period(name, value)?,
                "long_period" => *long_period = as_period(name, value)?,
                "rsi_period" => *rsi_period = as_period(name, value)?,
                "overbought" => *overbought = value,
                "oversold" => *oversold = value,
                _ => return Err(unknown_parameter(type_name, name)),
            },
            StrategyKind::BollingerReversion {
                period,
                k,
                rsi_period,
                overbought,
                oversold,
            } => match name {
                "period" => *period = as_period(name, value)?,
                "k" => *k = value,
                "rsi_period" => *rsi_period = as_period(name, value)?,
                "overbought" => *overbought = value,
                "oversold" => *oversold = value,
                _ => return Err(unknown_parameter(type_name, name)),
            },
            StrategyKind::Breakout {
                atr_period,
                level_window,
                level_lookback,
                proximity,
            } => match name {
                "atr_period" => *atr_period = as_period(name, value)?,
                "level_window" => *level_window = as_period(name, value)?,
                "level_lookback" => *level_lookback = as_period(name, value)?,
                "proximity" => *proximity = value,
                _ => return Err(unknown_parameter(type_name, name)),
            },
            StrategyKind::TrendFollowing {
                fast_period,
                slow_period,
                signal_period,
                adx_period,
                adx_threshold,
                adx_ceiling,
            } => match name {
                "fast_period" => *fast_period = as_period(name, value)?,
                "slow_period" => *slow_period = as_period(name, value)?,
                "signal_period" => *signal_period = as_period(name, value)?,
                "adx_period" => *adx_period = as_period(name, value)?,
                "adx_threshold" => *adx_threshold = value,
                "adx_ceiling" => *adx_ceiling = value,
                _ => return Err(unknown_parameter(type_name, name)),
            },
            StrategyKind::PatternVolume {
                lookback,
                volume_period,
            } => match name {
                "lookback" => *lookback = as_period(name, value)?,
                "volume_period" => *volume_period = as_period(name, value)?,
                _ => return Err(unknown_parameter(type_name, name)),
            },
        }
        Ok(())
    }
}

/// A validated strategy: variant parameters plus position risk settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub name: String,
    pub kind: StrategyKind,
    pub risk: RiskParams,
}

impl Strategy {
    pub fn new(
        name: impl Into<String>,
        kind: StrategyKind,
        risk: RiskParams,
    ) -> Result<Self, TradebenchError> {
        let strategy = Strategy {
            name: name.into(),
            kind,
            risk,
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Build a named variant from its defaults with the given overrides.
    pub fn from_parts<'a>(
        name: impl Into<String>,
        type_name: &str,
        risk: RiskParams,
        overrides: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, TradebenchError> {
        let mut kind = StrategyKind::from_type(type_name)?;
        for (key, value) in overrides {
            kind.set(key, value)?;
        }
        Strategy::new(name, kind, risk)
    }

    pub fn validate(&self) -> Result<(), TradebenchError> {
        let RiskParams {
            risk_fraction,
            stop_loss,
            take_profit,
        } = self.risk;
        if !risk_fraction.is_finite() || risk_fraction <= 0.0 || risk_fraction > 1.0 {
            return Err(TradebenchError::invalid_parameter(
                "risk_fraction",
                "must be in (0, 1]",
            ));
        }
        if !stop_loss.is_finite() || stop_loss <= 0.0 || stop_loss >= 1.0 {
            return Err(TradebenchError::invalid_parameter(
                "stop_loss",
                "must be in (0, 1)",
            ));
        }
        if !take_profit.is_finite() || take_profit <= 0.0 {
            return Err(TradebenchError::invalid_parameter(
                "take_profit",
                "must be positive",
            ));
        }
        self.kind.validate()
    }

    /// A revalidated copy with one parameter changed. Accepts variant
    /// parameter names as well as `risk_fraction`, `stop_loss` and
    /// `take_profit`.
    pub fn with_parameter(&self, name: &str, value: f64) -> Result<Self, TradebenchError> {
        self.with_parameters([(name, value)])
    }

    /// Like [`Strategy::with_parameter`] for several parameters at once.
    /// Validation runs after all of them are applied, so related fields
    /// such as short and long periods may move together.
    pub fn with_parameters<'a>(
        &self,
        parameters: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, TradebenchError> {
        let mut next = self.clone();
        for (name, value) in parameters {
            match name {
                "risk_fraction" => next.risk.risk_fraction = value,
                "stop_loss" => next.risk.stop_loss = value,
                "take_profit" => next.risk.take_profit = value,
                _ => next.kind.set(name, value)?,
            }
        }
        next.validate()?;
        Ok(next)
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        self.kind.required_indicators()
    }

    /// Whether `with_parameter` recognizes `name` for this strategy.
    pub fn accepts_parameter(&self, name: &str) -> bool {
        RISK_PARAMETERS.contains(&name) || self.kind.parameter_names().contains(&name)
    }
}

const RISK_PARAMETERS: [&str; 3] = ["risk_fraction", "stop_loss", "take_profit"];

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind.type_name())
    }
}

fn positive_period(name: &str, period: usize) -> Result<(), TradebenchError> {
    if period == 0 {
        return Err(TradebenchError::invalid_parameter(name, "must be positive"));
    }
    Ok(())
}

fn rsi_thresholds(overbought: f64, oversold: f64) -> Result<(), TradebenchError> {
    let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
    if !in_range(overbought) || !in_range(oversold) || oversold >= overbought {
        return Err(TradebenchError::invalid_parameter(
            "overbought",
            "need 0 <= oversold < overbought <= 100",
        ));
    }
    Ok(())
}

fn as_period(name: &str, value: f64) -> Result<usize, TradebenchError> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
        return Err(TradebenchError::invalid_parameter(
            name,
            format!("must be a positive whole number, got {}", value),
        ));
    }
    Ok(value as usize)
}

fn unknown_parameter(type_name: &str, name: &str) -> TradebenchError {
    TradebenchError::invalid_parameter(name, format!("not a parameter of {}", type_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ema_default() -> Strategy {
        Strategy::new(
            "ema",
            StrategyKind::from_type("ema_crossover").unwrap(),
            RiskParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn every_type_has_valid_defaults() {
        for t in STRATEGY_TYPES {
            let kind = StrategyKind::from_type(t).unwrap();
            assert_eq!(kind.type_name(), t);
            assert!(kind.validate().is_ok(), "{} defaults invalid", t);
            assert!(!kind.required_indicators().is_empty());
        }
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(matches!(
            StrategyKind::from_type("martingale"),
            Err(TradebenchError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn ema_crossover_requires_ema_pair_and_rsi() {
        assert_eq!(
            ema_default().required_indicators(),
            vec![
                IndicatorType::Ema(9),
                IndicatorType::Ema(21),
                IndicatorType::Rsi(14)
            ]
        );
    }

    #[test]
    fn short_must_be_below_long() {
        let err = ema_default().with_parameter("short_period", 21.0).unwrap_err();
        assert!(matches!(err, TradebenchError::InvalidParameter { .. }));
    }

    #[test]
    fn with_parameter_changes_one_field() {
        let s = ema_default().with_parameter("long_period", 30.0).unwrap();
        match s.kind {
            StrategyKind::EmaCrossover {
                short_period,
                long_period,
                ..
            } => {
                assert_eq!(short_period, 9);
                assert_eq!(long_period, 30);
            }
            _ => panic!("variant changed"),
        }
    }

    #[test]
    fn with_parameter_rejects_fractional_period() {
        assert!(ema_default().with_parameter("long_period", 30.5).is_err());
        assert!(ema_default().with_parameter("long_period", 0.0).is_err());
    }

    #[test]
    fn with_parameter_unknown_name() {
        assert!(matches!(
            ema_default().with_parameter("adx_period", 14.0),
            Err(TradebenchError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn with_parameter_updates_risk() {
        let s = ema_default().with_parameter("stop_loss", 0.01).unwrap();
        assert_eq!(s.risk.stop_loss, 0.01);
        assert!(ema_default().with_parameter("stop_loss", 0.0).is_err());
        assert!(ema_default().with_parameter("risk_fraction", 1.5).is_err());
    }

    #[test]
    fn from_parts_applies_overrides() {
        let s = Strategy::from_parts(
            "tf",
            "trend_following",
            RiskParams::default(),
            [("adx_threshold", 20.0), ("fast_period", 8.0)],
        )
        .unwrap();
        assert!(matches!(
            s.kind,
            StrategyKind::TrendFollowing {
                fast_period: 8,
                adx_threshold,
                ..
            } if adx_threshold == 20.0
        ));
    }

    #[test]
    fn invalid_thresholds_rejected() {
        let bad = Strategy::from_parts(
            "b",
            "bollinger_reversion",
            RiskParams::default(),
            [("oversold", 80.0)],
        );
        assert!(bad.is_err());

        let bad_adx = Strategy::from_parts(
            "t",
            "trend_following",
            RiskParams::default(),
            [("adx_ceiling", 20.0)],
        );
        assert!(bad_adx.is_err());
    }

    #[test]
    fn bollinger_k_must_be_positive() {
        let bad = Strategy::from_parts(
            "b",
            "bollinger_reversion",
            RiskParams::default(),
            [("k", 0.0)],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn breakout_lookback_must_cover_window() {
        let bad = Strategy::from_parts(
            "b",
            "breakout",
            RiskParams::default(),
            [("level_window", 3.0), ("level_lookback", 1.0)],
        );
        assert!(matches!(
            bad,
            Err(TradebenchError::InvalidParameter { ref name, .. }) if name == "level_lookback"
        ));
        let edge = Strategy::from_parts(
            "b",
            "breakout",
            RiskParams::default(),
            [("level_window", 3.0), ("level_lookback", 3.0)],
        );
        assert!(edge.is_ok());
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(&ema_default()).unwrap();
        assert_eq!(json["kind"]["type"], "ema_crossover");
        assert_eq!(json["kind"]["short_period"], 9);
    }

    #[test]
    fn accepts_variant_and_risk_parameters() {
        let s = ema_default();
        assert!(s.accepts_parameter("short_period"));
        assert!(s.accepts_parameter("take_profit"));
        assert!(!s.accepts_parameter("adx_period"));
    }

    #[test]
    fn display() {
        assert_eq!(ema_default().to_string(), "ema (ema_crossover)");
    }
}
