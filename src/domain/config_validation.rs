//! Configuration loading and validation.
//!
//! Builds the run inputs ([`BacktestConfig`], [`Strategy`], sweep ranges)
//! from a [`ConfigPort`]. Everything is checked here, before any market data
//! is fetched.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TradebenchError;
use crate::domain::metrics::DEFAULT_ANNUALIZATION;
use crate::domain::optimize::{parse_ranges, ParamRange};
use crate::domain::risk::RiskConfig;
use crate::domain::strategy::{RiskParams, Strategy, StrategyKind};
use crate::ports::config_port::ConfigPort;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TradebenchError> {
    let symbol = required_string(config, "backtest", "symbol")?;
    let timeframe = required_string(config, "backtest", "timeframe")?;
    let start = parse_timestamp(config, "start_date", false)?;
    let end = parse_timestamp(config, "end_date", true)?;
    if start > end {
        return Err(invalid("backtest", "start_date", "start_date must not be after end_date"));
    }

    let initial_balance = required_f64(config, "backtest", "initial_balance")?;
    if initial_balance <= 0.0 {
        return Err(invalid("backtest", "initial_balance", "initial_balance must be positive"));
    }
    let annualization_factor =
        optional_f64(config, "backtest", "annualization_factor", DEFAULT_ANNUALIZATION)?;
    if annualization_factor <= 0.0 {
        return Err(invalid(
            "backtest",
            "annualization_factor",
            "annualization_factor must be positive",
        ));
    }

    Ok(BacktestConfig {
        symbol,
        timeframe,
        start,
        end,
        initial_balance,
        annualization_factor,
        risk: load_risk_config(config)?,
    })
}

pub fn load_risk_config(config: &dyn ConfigPort) -> Result<RiskConfig, TradebenchError> {
    let defaults = RiskConfig::default();
    let risk = RiskConfig {
        max_position_risk_pct: optional_f64(
            config,
            "risk",
            "max_position_risk_pct",
            defaults.max_position_risk_pct,
        )?,
        min_risk_reward: optional_f64(config, "risk", "min_risk_reward", defaults.min_risk_reward)?,
        min_stop_distance_pct: optional_f64(
            config,
            "risk",
            "min_stop_distance_pct",
            defaults.min_stop_distance_pct,
        )?,
        max_stop_distance_pct: optional_f64(
            config,
            "risk",
            "max_stop_distance_pct",
            defaults.max_stop_distance_pct,
        )?,
    };

    for (key, value) in [
        ("max_position_risk_pct", risk.max_position_risk_pct),
        ("min_risk_reward", risk.min_risk_reward),
        ("min_stop_distance_pct", risk.min_stop_distance_pct),
        ("max_stop_distance_pct", risk.max_stop_distance_pct),
    ] {
        if value < 0.0 {
            return Err(invalid("risk", key, format!("{} must be non-negative", key)));
        }
    }
    if risk.min_stop_distance_pct > risk.max_stop_distance_pct {
        return Err(invalid(
            "risk",
            "min_stop_distance_pct",
            "min_stop_distance_pct must not exceed max_stop_distance_pct",
        ));
    }
    Ok(risk)
}

/// Build the configured strategy. Variant fields that are absent keep their
/// defaults.
pub fn load_strategy(config: &dyn ConfigPort) -> Result<Strategy, TradebenchError> {
    let type_name = required_string(config, "strategy", "type")?;
    let kind = StrategyKind::from_type(&type_name).map_err(|_| {
        invalid(
            "strategy",
            "type",
            format!("unknown strategy type '{}'", type_name),
        )
    })?;
    let name = config
        .get_string("strategy", "name")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| type_name.clone());

    let defaults = RiskParams::default();
    let risk = RiskParams {
        risk_fraction: optional_f64(config, "strategy", "risk_fraction", defaults.risk_fraction)?,
        stop_loss: optional_f64(config, "strategy", "stop_loss", defaults.stop_loss)?,
        take_profit: optional_f64(config, "strategy", "take_profit", defaults.take_profit)?,
    };

    let mut overrides = Vec::new();
    for &key in kind.parameter_names() {
        if let Some(value) = parse_f64(config, "strategy", key)? {
            overrides.push((key, value));
        }
    }
    let strategy = Strategy::from_parts(name, &type_name, risk, overrides)?;
    tracing::debug!(strategy = %strategy, "strategy loaded");
    Ok(strategy)
}

/// Sweep ranges from `[optimize] params`; absent means no ranges.
pub fn load_sweep_ranges(config: &dyn ConfigPort) -> Result<Vec<ParamRange>, TradebenchError> {
    match config.get_string("optimize", "params") {
        Some(spec) => parse_ranges(&spec).map_err(|e| invalid("optimize", "params", e.to_string())),
        None => Ok(Vec::new()),
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`. A bare end date covers the
/// whole day.
pub fn parse_datetime(raw: &str, end_of_day: bool) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(ts);
    }
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time))
}

fn parse_timestamp(
    config: &dyn ConfigPort,
    key: &str,
    end_of_day: bool,
) -> Result<NaiveDateTime, TradebenchError> {
    let raw = required_string(config, "backtest", key)?;
    parse_datetime(&raw, end_of_day).ok_or_else(|| {
        invalid(
            "backtest",
            key,
            format!("invalid {} '{}', expected YYYY-MM-DD [HH:MM:SS]", key, raw),
        )
    })
}

fn required_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TradebenchError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(TradebenchError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn parse_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, TradebenchError> {
    match config.get_f64(section, key) {
        None => Ok(None),
        Some(Ok(v)) if v.is_finite() => Ok(Some(v)),
        Some(Ok(v)) => Err(invalid(section, key, format!("{} must be finite, got {}", key, v))),
        Some(Err(reason)) => Err(invalid(section, key, reason)),
    }
}

fn required_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, TradebenchError> {
    parse_f64(config, section, key)?.ok_or_else(|| TradebenchError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn optional_f64(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, TradebenchError> {
    Ok(parse_f64(config, section, key)?.unwrap_or(default))
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TradebenchError {
    TradebenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
