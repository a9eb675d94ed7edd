//! Backtest orchestration.
//!
//! One run drives a candle series through indicator computation, strategy
//! evaluation, position simulation and performance analysis. A run is a pure
//! function of (candles, strategy, config): the same inputs always produce
//! the same [`BacktestResult`].

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::candle::{validate_series, Candle};
use crate::domain::error::TradebenchError;
use crate::domain::evaluator::evaluate;
use crate::domain::indicator::{find_key_levels, summarize_trend, IndicatorSet, KeyLevels, TrendSummary};
use crate::domain::metrics::{PerformanceStats, DEFAULT_ANNUALIZATION};
use crate::domain::position::{EquityPoint, TradeRecord};
use crate::domain::risk::{RiskConfig, RiskManager};
use crate::domain::simulator::PositionSimulator;
use crate::domain::strategy::Strategy;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbol: String,
    pub timeframe: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub initial_balance: f64,
    pub annualization_factor: f64,
    pub risk: RiskConfig,
}

impl BacktestConfig {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        initial_balance: f64,
    ) -> Self {
        BacktestConfig {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            start,
            end,
            initial_balance,
            annualization_factor: DEFAULT_ANNUALIZATION,
            risk: RiskConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), TradebenchError> {
        if self.symbol.trim().is_empty() {
            return Err(TradebenchError::invalid_parameter("symbol", "must not be empty"));
        }
        if !self.initial_balance.is_finite() || self.initial_balance <= 0.0 {
            return Err(TradebenchError::invalid_parameter(
                "initial_balance",
                "must be positive",
            ));
        }
        if !self.annualization_factor.is_finite() || self.annualization_factor <= 0.0 {
            return Err(TradebenchError::invalid_parameter(
                "annualization_factor",
                "must be positive",
            ));
        }
        if self.start > self.end {
            return Err(TradebenchError::invalid_parameter(
                "start",
                format!("start {} is after end {}", self.start, self.end),
            ));
        }
        Ok(())
    }
}

/// Pivot window used for the reported key levels.
pub const KEY_LEVEL_WINDOW: usize = 2;

/// Whole-series market structure reported next to the trades. Computed after
/// the run over every bar, so it never feeds a signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketContext {
    pub trend: TrendSummary,
    pub key_levels: KeyLevels,
}

impl MarketContext {
    pub fn from_candles(candles: &[Candle]) -> Self {
        MarketContext {
            trend: summarize_trend(candles),
            // Too few bars for a pivot means no levels.
            key_levels: find_key_levels(candles, KEY_LEVEL_WINDOW).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub timeframe: String,
    pub strategy: Strategy,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub bars: usize,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub performance: PerformanceStats,
    pub market: MarketContext,
}

/// Run one strategy over an already-fetched candle series.
pub fn run_backtest(
    candles: &[Candle],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, TradebenchError> {
    config.validate()?;
    strategy.validate()?;
    validate_series(candles)?;

    tracing::info!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        strategy = %strategy,
        bars = candles.len(),
        "backtest started"
    );

    let indicators = IndicatorSet::compute(candles, &strategy.required_indicators()).into_complete()?;

    let mut simulator = PositionSimulator::new(
        config.symbol.clone(),
        config.initial_balance,
        strategy.risk,
        RiskManager::new(config.risk),
    );
    for (i, candle) in candles.iter().enumerate() {
        let signal = evaluate(&strategy.kind, &config.symbol, candles, &indicators, i);
        if signal.is_entry() {
            tracing::trace!(
                index = i,
                direction = %signal.direction,
                confidence = signal.confidence,
                "signal"
            );
        }
        simulator.on_bar(candle, &signal)?;
    }
    if let Some(last) = candles.last() {
        simulator.finish(last)?;
    }
    let ledger = simulator.into_ledger()?;

    let performance = PerformanceStats::compute(
        &ledger.trades,
        config.initial_balance,
        config.annualization_factor,
    );

    tracing::info!(
        symbol = %config.symbol,
        strategy = %strategy,
        trades = ledger.trades.len(),
        final_balance = ledger.final_balance,
        "backtest finished"
    );

    Ok(BacktestResult {
        symbol: config.symbol.clone(),
        timeframe: config.timeframe.clone(),
        strategy: strategy.clone(),
        initial_balance: config.initial_balance,
        final_balance: ledger.final_balance,
        bars: candles.len(),
        trades: ledger.trades,
        equity_curve: ledger.equity_curve,
        performance,
        market: MarketContext::from_candles(candles),
    })
}

/// Fetch the configured series once, then run.
pub fn fetch_and_run(
    data: &dyn DataPort,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, TradebenchError> {
    config.validate()?;
    let candles = fetch_series(data, config)?;
    run_backtest(&candles, strategy, config)
}

pub fn fetch_series(data: &dyn DataPort, config: &BacktestConfig) -> Result<Vec<Candle>, TradebenchError> {
    let candles = data.fetch_candles(&config.symbol, &config.timeframe, config.start, config.end)?;
    tracing::debug!(
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        bars = candles.len(),
        "fetched candles"
    );
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candles_from_closes;
    use crate::domain::indicator::TrendBias;
    use crate::domain::position::ExitReason;
    use crate::domain::strategy::{RiskParams, StrategyKind};
    use chrono::NaiveDate;

    fn config() -> BacktestConfig {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        BacktestConfig::new("TEST", "1h", start, end, 10_000.0)
    }

    fn ema_strategy() -> Strategy {
        Strategy::new(
            "ema",
            StrategyKind::from_type("ema_crossover").unwrap(),
            RiskParams {
                risk_fraction: 0.02,
                stop_loss: 0.02,
                take_profit: 0.2,
            },
        )
        .unwrap()
    }

    fn climb() -> Vec<Candle> {
        let mut closes = vec![100.0; 25];
        let mut price = 100.0;
        for k in 0..25 {
            price += if k % 2 == 0 { 2.0 } else { -1.0 };
            closes.push(price);
        }
        candles_from_closes(&closes)
            .into_iter()
            .map(|mut c| {
                c.high = c.close + 0.5;
                c.low = c.close - 0.5;
                c
            })
            .collect()
    }

    #[test]
    fn config_validation() {
        assert!(config().validate().is_ok());
        let bad = BacktestConfig {
            initial_balance: 0.0,
            ..config()
        };
        assert!(matches!(
            bad.validate(),
            Err(TradebenchError::InvalidParameter { .. })
        ));
        let inverted = BacktestConfig {
            start: config().end,
            end: config().start,
            ..config()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn result_carries_market_context() {
        let candles = climb();
        let result = run_backtest(&candles, &ema_strategy(), &config()).unwrap();
        assert_eq!(result.market.trend.short, Some(TrendBias::Bullish));
        assert_eq!(result.market.trend.long, None);
        assert_eq!(
            result.market.key_levels,
            find_key_levels(&candles, KEY_LEVEL_WINDOW).unwrap()
        );
    }

    #[test]
    fn market_context_of_short_series_is_empty() {
        let context = MarketContext::from_candles(&climb()[..3]);
        assert_eq!(context.key_levels, KeyLevels::default());
        assert_eq!(context.trend.short, None);
    }

    #[test]
    fn climb_yields_one_forced_long() {
        let result = run_backtest(&climb(), &ema_strategy(), &config()).unwrap();
        assert_eq!(result.trades.len(), 1);
        let t = &result.trades[0];
        assert_eq!(t.entry_price, 101.0);
        assert_eq!(t.exit_price, 114.0);
        assert_eq!(t.exit_reason, ExitReason::ForcedExit);
        assert!(t.profit > 0.0);
        assert!(result.final_balance > result.initial_balance);
        assert_eq!(result.equity_curve.len(), 1);
    }

    #[test]
    fn flat_series_has_no_trades() {
        let result = run_backtest(&candles_from_closes(&[100.0; 30]), &ema_strategy(), &config()).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.final_balance, 10_000.0);
        assert_eq!(result.performance.total_trades, 0);
        assert_eq!(result.performance.profit_factor, 0.0);
    }

    #[test]
    fn short_series_is_insufficient_data() {
        let err = run_backtest(&candles_from_closes(&[100.0; 10]), &ema_strategy(), &config()).unwrap_err();
        assert!(matches!(err, TradebenchError::InsufficientData { .. }));
    }

    #[test]
    fn invalid_series_rejected() {
        let mut candles = candles_from_closes(&[100.0; 30]);
        candles.swap(3, 4);
        assert!(matches!(
            run_backtest(&candles, &ema_strategy(), &config()),
            Err(TradebenchError::InvalidSeries { index: 4, .. })
        ));
    }

    #[test]
    fn runs_are_identical() {
        let a = run_backtest(&climb(), &ema_strategy(), &config()).unwrap();
        let b = run_backtest(&climb(), &ema_strategy(), &config()).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
