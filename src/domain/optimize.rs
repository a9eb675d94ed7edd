//! Parameter sweep over strategy parameters.
//!
//! A sweep expands `name:min:max:step` ranges into the cartesian product of
//! parameter combinations, runs one independent backtest per combination and
//! ranks the completed runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::candle::{validate_series, Candle};
use crate::domain::error::TradebenchError;
use crate::domain::metrics::PerformanceStats;
use crate::domain::strategy::Strategy;

/// Profit factor used for robustness scoring when a run has no losses.
pub const PROFIT_FACTOR_CAP: f64 = 10.0;

/// Number of entries kept in [`SweepReport::robust`].
pub const ROBUST_TOP_N: usize = 5;

/// Most values a single range may expand to.
pub const MAX_RANGE_VALUES: usize = 10_000;

/// Most combinations a sweep may expand to.
pub const MAX_COMBINATIONS: usize = 100_000;

// Absorbs float error when (max - min) / step lands just under an integer.
const STEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamRange {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ParamRange {
    pub fn new(name: impl Into<String>, min: f64, max: f64, step: f64) -> Result<Self, TradebenchError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TradebenchError::invalid_parameter("range", "parameter name is empty"));
        }
        if !min.is_finite() || !max.is_finite() || !step.is_finite() {
            return Err(TradebenchError::invalid_parameter(name, "range bounds must be finite"));
        }
        if step <= 0.0 {
            return Err(TradebenchError::invalid_parameter(name, "step must be positive"));
        }
        if min > max {
            return Err(TradebenchError::invalid_parameter(
                name,
                format!("min {} is greater than max {}", min, max),
            ));
        }
        let count = raw_count(min, max, step);
        if !count.is_finite() || count > MAX_RANGE_VALUES as f64 {
            return Err(TradebenchError::invalid_parameter(
                name,
                format!("range expands to more than {} values", MAX_RANGE_VALUES),
            ));
        }
        Ok(ParamRange { name, min, max, step })
    }

    /// Parse `name:min:max:step`.
    pub fn parse(spec: &str) -> Result<Self, TradebenchError> {
        let parts: Vec<&str> = spec.trim().split(':').map(str::trim).collect();
        let [name, min, max, step] = parts.as_slice() else {
            return Err(TradebenchError::invalid_parameter(
                "range",
                format!("'{}' is not of the form name:min:max:step", spec.trim()),
            ));
        };
        let number = |field: &str, raw: &str| {
            raw.parse::<f64>().map_err(|_| {
                TradebenchError::invalid_parameter(
                    name.to_string(),
                    format!("{} '{}' is not a number", field, raw),
                )
            })
        };
        ParamRange::new(*name, number("min", *min)?, number("max", *max)?, number("step", *step)?)
    }

    /// `min + i * step` for `i = 0..=floor((max - min) / step)`.
    pub fn values(&self) -> Vec<f64> {
        (0..self.value_count()).map(|i| self.min + i as f64 * self.step).collect()
    }

    pub fn value_count(&self) -> usize {
        let count = raw_count(self.min, self.max, self.step);
        if count.is_finite() {
            (count as usize).min(MAX_RANGE_VALUES)
        } else {
            0
        }
    }
}

fn raw_count(min: f64, max: f64, step: f64) -> f64 {
    ((max - min) / step + STEP_EPSILON).floor() + 1.0
}

/// Parse a comma-separated list of ranges. Blank input gives no ranges.
pub fn parse_ranges(spec: &str) -> Result<Vec<ParamRange>, TradebenchError> {
    spec.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(ParamRange::parse)
        .collect()
}

/// Size of the cartesian product, rejecting sweeps over [`MAX_COMBINATIONS`].
pub fn combination_count(ranges: &[ParamRange]) -> Result<usize, TradebenchError> {
    ranges
        .iter()
        .try_fold(1usize, |acc, r| acc.checked_mul(r.value_count()))
        .filter(|&n| n <= MAX_COMBINATIONS)
        .ok_or_else(|| {
            TradebenchError::invalid_parameter(
                "params",
                format!("sweep expands to more than {} combinations", MAX_COMBINATIONS),
            )
        })
}

/// Cartesian product of all range values, first range varying slowest.
pub fn combinations(ranges: &[ParamRange]) -> Result<Vec<BTreeMap<String, f64>>, TradebenchError> {
    combination_count(ranges)?;
    let mut out = vec![BTreeMap::new()];
    for range in ranges {
        let values = range.values();
        out = out
            .into_iter()
            .flat_map(|combo| {
                values.iter().map(move |&v| {
                    let mut next = combo.clone();
                    next.insert(range.name.clone(), v);
                    next
                })
            })
            .collect();
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepEntry {
    pub index: usize,
    pub parameters: BTreeMap<String, f64>,
    pub final_balance: f64,
    pub performance: PerformanceStats,
}

impl SweepEntry {
    /// `0.3*PF + 0.3*Sharpe + 0.2*(1 - maxDD) + 0.2*winRate`, PF capped.
    pub fn robustness_score(&self) -> f64 {
        let p = &self.performance;
        0.3 * p.profit_factor.min(PROFIT_FACTOR_CAP)
            + 0.3 * p.sharpe_ratio
            + 0.2 * (1.0 - p.max_drawdown)
            + 0.2 * p.win_rate
    }
}

/// A combination that did not produce a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSkip {
    pub index: usize,
    pub parameters: BTreeMap<String, f64>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub score: f64,
    pub entry: SweepEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub strategy: String,
    pub combinations: usize,
    pub rejected: Vec<SweepSkip>,
    pub failed: Vec<SweepSkip>,
    pub cancelled: usize,
    pub entries: Vec<SweepEntry>,
    pub best_by_profit_factor: Option<SweepEntry>,
    pub best_by_sharpe: Option<SweepEntry>,
    pub best_by_drawdown: Option<SweepEntry>,
    pub robust: Vec<RankedEntry>,
}

impl SweepReport {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }
}

enum Outcome {
    Done(SweepEntry),
    Failed(SweepSkip),
    Cancelled,
}

struct Job {
    index: usize,
    parameters: BTreeMap<String, f64>,
    strategy: Strategy,
}

/// Sweep executor. Parallel by default.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    ranges: Vec<ParamRange>,
    parallel: bool,
}

impl ParamSweep {
    pub fn new(ranges: Vec<ParamRange>) -> Self {
        ParamSweep {
            ranges,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn ranges(&self) -> &[ParamRange] {
        &self.ranges
    }

    /// Run every combination against `candles`.
    ///
    /// Combinations that fail strategy validation are rejected without
    /// running; runs that fail (for example on insufficient data) are
    /// recorded as failed. The cancel flag is checked before each run.
    pub fn run(
        &self,
        candles: &[Candle],
        base: &Strategy,
        config: &BacktestConfig,
        cancel: Option<&AtomicBool>,
    ) -> Result<SweepReport, TradebenchError> {
        config.validate()?;
        base.validate()?;
        validate_series(candles)?;
        if let Some(unknown) = self.ranges.iter().find(|r| !base.accepts_parameter(&r.name)) {
            return Err(TradebenchError::invalid_parameter(
                unknown.name.clone(),
                format!("not a parameter of {}", base.kind.type_name()),
            ));
        }

        let combos = combinations(&self.ranges)?;
        let total = combos.len();
        tracing::info!(strategy = %base, combinations = total, parallel = self.parallel, "sweep started");

        let mut rejected = Vec::new();
        let mut jobs = Vec::new();
        for (index, parameters) in combos.into_iter().enumerate() {
            let strategy = base.with_parameters(parameters.iter().map(|(k, &v)| (k.as_str(), v)));
            match strategy {
                Ok(strategy) => jobs.push(Job {
                    index,
                    parameters,
                    strategy,
                }),
                Err(e) => {
                    tracing::debug!(index, reason = %e, "combination rejected");
                    rejected.push(SweepSkip {
                        index,
                        parameters,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let execute = |job: &Job| -> Outcome {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Outcome::Cancelled;
            }
            match run_backtest(candles, &job.strategy, config) {
                Ok(result) => Outcome::Done(SweepEntry {
                    index: job.index,
                    parameters: job.parameters.clone(),
                    final_balance: result.final_balance,
                    performance: result.performance,
                }),
                Err(e) => {
                    tracing::debug!(index = job.index, reason = %e, "combination failed");
                    Outcome::Failed(SweepSkip {
                        index: job.index,
                        parameters: job.parameters.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        };

        let outcomes: Vec<Outcome> = if self.parallel {
            jobs.par_iter().map(execute).collect()
        } else {
            jobs.iter().map(execute).collect()
        };

        let mut entries = Vec::new();
        let mut failed = Vec::new();
        let mut cancelled = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Done(entry) => entries.push(entry),
                Outcome::Failed(skip) => failed.push(skip),
                Outcome::Cancelled => cancelled += 1,
            }
        }
        if cancelled > 0 {
            tracing::warn!(cancelled, "sweep cancelled before all combinations ran");
        }

        let report = rank(base.to_string(), total, rejected, failed, cancelled, entries);
        tracing::info!(
            strategy = %base,
            completed = report.entries.len(),
            rejected = report.rejected.len(),
            failed = report.failed.len(),
            "sweep finished"
        );
        Ok(report)
    }
}

fn rank(
    strategy: String,
    combinations: usize,
    rejected: Vec<SweepSkip>,
    failed: Vec<SweepSkip>,
    cancelled: usize,
    entries: Vec<SweepEntry>,
) -> SweepReport {
    // Runs without trades have degenerate statistics and are not ranked.
    let traded: Vec<&SweepEntry> = entries
        .iter()
        .filter(|e| e.performance.total_trades > 0)
        .collect();

    let best_by = |better: fn(&SweepEntry, &SweepEntry) -> bool| {
        traded
            .iter()
            .fold(None::<&SweepEntry>, |best, &e| match best {
                Some(b) if !better(e, b) => Some(b),
                _ => Some(e),
            })
            .cloned()
    };
    let best_by_profit_factor =
        best_by(|a, b| a.performance.profit_factor > b.performance.profit_factor);
    let best_by_sharpe = best_by(|a, b| a.performance.sharpe_ratio > b.performance.sharpe_ratio);
    let best_by_drawdown = best_by(|a, b| a.performance.max_drawdown < b.performance.max_drawdown);

    let mut robust: Vec<RankedEntry> = traded
        .iter()
        .map(|&e| RankedEntry {
            score: e.robustness_score(),
            entry: e.clone(),
        })
        .collect();
    robust.sort_by(|a, b| b.score.total_cmp(&a.score));
    robust.truncate(ROBUST_TOP_N);

    SweepReport {
        strategy,
        combinations,
        rejected,
        failed,
        cancelled,
        entries,
        best_by_profit_factor,
        best_by_sharpe,
        best_by_drawdown,
        robust,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candles_from_closes;
    use crate::domain::strategy::{RiskParams, StrategyKind};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn config() -> BacktestConfig {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        BacktestConfig::new("TEST", "1h", start, start + chrono::Duration::days(30), 10_000.0)
    }

    fn ema() -> Strategy {
        Strategy::new(
            "ema",
            StrategyKind::from_type("ema_crossover").unwrap(),
            RiskParams::default(),
        )
        .unwrap()
    }

    fn zigzag() -> Vec<Candle> {
        let mut closes = vec![100.0; 25];
        let mut price = 100.0;
        for k in 0..40 {
            price += match k % 20 {
                0..=9 => if k % 2 == 0 { 2.0 } else { -1.0 },
                _ => if k % 2 == 0 { -2.0 } else { 1.0 },
            };
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

    fn entry(index: usize, pf: f64, sharpe: f64, dd: f64, win_rate: f64) -> SweepEntry {
        let mut performance = PerformanceStats::compute(&[], 10_000.0, 252.0);
        performance.total_trades = 4;
        performance.profit_factor = pf;
        performance.sharpe_ratio = sharpe;
        performance.max_drawdown = dd;
        performance.win_rate = win_rate;
        SweepEntry {
            index,
            parameters: BTreeMap::new(),
            final_balance: 10_000.0,
            performance,
        }
    }

    #[test]
    fn parse_range() {
        let r = ParamRange::parse("short_period:5:9:2").unwrap();
        assert_eq!(r.name, "short_period");
        assert_eq!(r.values(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn fractional_step_includes_max() {
        let r = ParamRange::parse("k:1.5:2.5:0.1").unwrap();
        let values = r.values();
        assert_eq!(values.len(), 11);
        assert_relative_eq!(*values.last().unwrap(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn single_point_range() {
        assert_eq!(ParamRange::parse("k:2:2:1").unwrap().values(), vec![2.0]);
    }

    #[test]
    fn malformed_ranges_rejected() {
        for bad in ["k:1:2", "k:a:2:1", "k:3:2:1", "k:1:2:0", "k:1:2:-1", ":1:2:1"] {
            assert!(
                matches!(ParamRange::parse(bad), Err(TradebenchError::InvalidParameter { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn parse_range_list() {
        let ranges = parse_ranges("a:1:2:1, b:0:1:0.5").unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(parse_ranges("  ").unwrap().is_empty());
    }

    #[test]
    fn cartesian_product_order() {
        let ranges = parse_ranges("a:1:2:1,b:10:20:10").unwrap();
        let combos = combinations(&ranges).unwrap();
        let pairs: Vec<(f64, f64)> = combos.iter().map(|c| (c["a"], c["b"])).collect();
        assert_eq!(pairs, vec![(1.0, 10.0), (1.0, 20.0), (2.0, 10.0), (2.0, 20.0)]);
        assert_eq!(combinations(&[]).unwrap().len(), 1);
    }

    #[test]
    fn oversized_ranges_rejected() {
        for bad in ["k:0:1:1e-300", "k:0:1e12:1", "k:-1e308:1e308:1e-10"] {
            assert!(
                matches!(ParamRange::parse(bad), Err(TradebenchError::InvalidParameter { .. })),
                "{bad} should be rejected"
            );
        }
        let at_cap = ParamRange::parse("k:1:10000:1").unwrap();
        assert_eq!(at_cap.value_count(), MAX_RANGE_VALUES);
        assert!(ParamRange::parse("k:1:10001:1").is_err());
    }

    #[test]
    fn oversized_product_rejected() {
        let ranges = parse_ranges("short_period:1:1000:1,long_period:1:1000:1").unwrap();
        assert!(matches!(
            combination_count(&ranges),
            Err(TradebenchError::InvalidParameter { .. })
        ));
        assert!(combinations(&ranges).is_err());
        let err = ParamSweep::new(ranges)
            .run(&zigzag(), &ema(), &config(), None)
            .unwrap_err();
        assert!(matches!(err, TradebenchError::InvalidParameter { .. }));
        assert_eq!(combination_count(&parse_ranges("a:1:100:1,b:1:1000:1").unwrap()).unwrap(), 100_000);
    }

    #[test]
    fn unknown_parameter_rejected_up_front() {
        let sweep = ParamSweep::new(parse_ranges("atr_period:5:10:5").unwrap());
        let err = sweep.run(&zigzag(), &ema(), &config(), None).unwrap_err();
        assert!(matches!(err, TradebenchError::InvalidParameter { .. }));
    }

    #[test]
    fn invalid_combinations_counted_as_rejected() {
        let sweep = ParamSweep::new(parse_ranges("short_period:5:9:2,long_period:9:21:12").unwrap());
        let report = sweep.run(&zigzag(), &ema(), &config(), None).unwrap();
        assert_eq!(report.combinations, 6);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].parameters["short_period"], 9.0);
        assert_eq!(report.entries.len() + report.failed.len(), 5);
        assert_eq!(report.cancelled, 0);
    }

    #[test]
    fn runs_needing_more_data_are_failed() {
        let sweep = ParamSweep::new(parse_ranges("long_period:21:121:100").unwrap());
        let report = sweep.run(&zigzag(), &ema(), &config(), None).unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].parameters["long_period"], 121.0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let ranges = parse_ranges("short_period:3:7:2,stop_loss:0.01:0.03:0.01").unwrap();
        let parallel = ParamSweep::new(ranges.clone())
            .run(&zigzag(), &ema(), &config(), None)
            .unwrap();
        let sequential = ParamSweep::new(ranges)
            .with_parallelism(false)
            .run(&zigzag(), &ema(), &config(), None)
            .unwrap();
        assert_eq!(parallel, sequential);
        let indices: Vec<usize> = parallel.entries.iter().map(|e| e.index).collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted);
    }

    #[test]
    fn preset_cancel_flag_runs_nothing() {
        let cancel = AtomicBool::new(true);
        let sweep = ParamSweep::new(parse_ranges("short_period:3:7:2").unwrap());
        let report = sweep.run(&zigzag(), &ema(), &config(), Some(&cancel)).unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(report.cancelled, 3);
        assert!(report.was_cancelled());
    }

    #[test]
    fn ranking_picks_bests_and_keeps_order_on_ties() {
        let entries = vec![
            entry(0, 1.5, 1.0, 0.10, 0.5),
            entry(1, 2.0, 0.5, 0.20, 0.5),
            entry(2, 2.0, 1.2, 0.05, 0.6),
        ];
        let report = rank("s".into(), 3, vec![], vec![], 0, entries);
        assert_eq!(report.best_by_profit_factor.unwrap().index, 1);
        assert_eq!(report.best_by_sharpe.unwrap().index, 2);
        assert_eq!(report.best_by_drawdown.unwrap().index, 2);
        assert_eq!(report.robust[0].entry.index, 2);
    }

    #[test]
    fn infinite_profit_factor_is_capped_for_score() {
        let e = entry(0, f64::INFINITY, 0.0, 0.0, 1.0);
        assert_relative_eq!(e.robustness_score(), 0.3 * PROFIT_FACTOR_CAP + 0.2 + 0.2);
    }

    #[test]
    fn robust_list_is_top_five() {
        let entries: Vec<SweepEntry> = (0..8)
            .map(|i| entry(i, 1.0 + i as f64 * 0.1, 0.0, 0.1, 0.5))
            .collect();
        let report = rank("s".into(), 8, vec![], vec![], 0, entries);
        let order: Vec<usize> = report.robust.iter().map(|r| r.entry.index).collect();
        assert_eq!(order, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn untraded_entries_are_not_ranked() {
        let mut idle = entry(0, 0.0, 0.0, 0.0, 0.0);
        idle.performance.total_trades = 0;
        let report = rank("s".into(), 1, vec![], vec![], 0, vec![idle]);
        assert!(report.best_by_drawdown.is_none());
        assert!(report.robust.is_empty());
        assert_eq!(report.entries.len(), 1);
    }
}
