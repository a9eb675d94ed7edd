//! Performance statistics over a closed-trade ledger.
//!
//! Empty and one-sided ledgers resolve to fixed values rather than NaN:
//! - win rate 0 with no trades
//! - profit factor +inf with wins and no losses, 0 with neither
//! - Sharpe/Sortino 0 when the deviation is 0
//! - max drawdown 0 while cumulative profit has never been positive
//! - averages 0 over an empty subset

use serde::{Serialize, Serializer};

use crate::domain::position::TradeRecord;

pub const DEFAULT_ANNUALIZATION: f64 = 252.0;

/// Serializes a ratio that may be unbounded. JSON has no infinity, so
/// non-finite values are written as the strings `"Infinity"`, `"-Infinity"`
/// or `"NaN"`; finite values stay numbers.
pub fn serialize_ratio<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("NaN")
    } else if *value > 0.0 {
        serializer.serialize_str("Infinity")
    } else {
        serializer.serialize_str("-Infinity")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub expectancy: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub net_profit: f64,
    pub total_return: f64,
    pub avg_trade_duration_secs: f64,
}

impl PerformanceStats {
    /// Per-trade returns are profit / initial balance; `annualization` is
    /// the number of periods per year used to scale Sharpe and Sortino.
    pub fn compute(trades: &[TradeRecord], initial_balance: f64, annualization: f64) -> Self {
        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut breakeven_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_secs = 0i64;

        for trade in trades {
            let pnl = trade.profit;
            if pnl > 0.0 {
                winning_trades += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losing_trades += 1;
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                breakeven_trades += 1;
            }
            total_duration_secs += trade.holding_secs();
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let average_win = if winning_trades > 0 {
            gross_profit / winning_trades as f64
        } else {
            0.0
        };
        let average_loss = if losing_trades > 0 {
            gross_loss / losing_trades as f64
        } else {
            0.0
        };
        let expectancy = win_rate * average_win - (1.0 - win_rate) * average_loss;

        let net_profit = gross_profit - gross_loss;
        let total_return = if initial_balance > 0.0 {
            net_profit / initial_balance
        } else {
            0.0
        };

        let returns: Vec<f64> = if initial_balance > 0.0 {
            trades.iter().map(|t| t.profit / initial_balance).collect()
        } else {
            Vec::new()
        };
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns, annualization);

        let avg_trade_duration_secs = if total_trades > 0 {
            total_duration_secs as f64 / total_trades as f64
        } else {
            0.0
        };

        PerformanceStats {
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades,
            win_rate,
            profit_factor,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown: compute_drawdown(trades),
            expectancy,
            average_win,
            average_loss,
            largest_win,
            largest_loss,
            gross_profit,
            gross_loss,
            net_profit,
            total_return,
            avg_trade_duration_secs,
        }
    }
}

/// Largest (peak - current) / peak over cumulative profit, in trade order.
fn compute_drawdown(trades: &[TradeRecord]) -> f64 {
    let mut peak = 0.0_f64;
    let mut cumulative = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for trade in trades {
        cumulative += trade.profit;
        if cumulative > peak {
            peak = cumulative;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - cumulative) / peak);
        }
    }
    max_dd
}

fn compute_risk_adjusted(returns: &[f64], annualization: f64) -> (f64, f64) {
    if returns.is_empty() || !(annualization > 0.0) {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let scale = annualization.sqrt();

    let sharpe = if stddev > 0.0 {
        mean / stddev * scale
    } else {
        0.0
    };

    let downside = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum::<f64>() / n;
    let downside_stddev = downside.sqrt();
    let sortino = if downside_stddev > 0.0 {
        mean / downside_stddev * scale
    } else {
        0.0
    };

    (sharpe, sortino)
}
