//! Single-position trade simulator.
//!
//! State machine per run: IDLE -> OPEN on an accepted entry signal, OPEN ->
//! IDLE on an opposing or CLOSE signal, a stop/target touch, or the forced
//! exit at series end. At most one position is open at any time.
//!
//! Bar processing order while OPEN:
//! 1. Stop and target are checked against the bar's low/high. If both are
//!    touched the stop is taken. Fills happen at the level price.
//! 2. The bar's signal is applied. An opposing or CLOSE signal exits at the
//!    signal price and no new entry is taken on that bar.
//!
//! While IDLE, a LONG/SHORT signal opens a position sized by
//! [`recommend_size`] from the current balance.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;
use crate::domain::position::{EquityPoint, ExitReason, Side, SimulatedPosition, TradeRecord};
use crate::domain::risk::{recommend_size, RiskManager};
use crate::domain::signal::{Direction, Signal};
use crate::domain::strategy::RiskParams;

#[derive(Debug, Clone)]
struct OpenTrade {
    position: SimulatedPosition,
    confidence: f64,
    warnings: Vec<String>,
    metadata: BTreeMap<String, String>,
}

/// Closed trades, equity curve and final balance of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_balance: f64,
}

#[derive(Debug)]
pub struct PositionSimulator {
    symbol: String,
    balance: f64,
    risk: RiskParams,
    risk_manager: RiskManager,
    open: Option<OpenTrade>,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
    last_time: Option<NaiveDateTime>,
}

impl PositionSimulator {
    pub fn new(
        symbol: impl Into<String>,
        initial_balance: f64,
        risk: RiskParams,
        risk_manager: RiskManager,
    ) -> Self {
        PositionSimulator {
            symbol: symbol.into(),
            balance: initial_balance,
            risk,
            risk_manager,
            open: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            last_time: None,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn open_position(&self) -> Option<&SimulatedPosition> {
        self.open.as_ref().map(|t| &t.position)
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Feed one bar and the signal evaluated on it. Bars must arrive in
    /// strictly increasing time order.
    pub fn on_bar(&mut self, candle: &Candle, signal: &Signal) -> Result<(), TradebenchError> {
        if let Some(last) = self.last_time {
            if candle.timestamp <= last {
                return Err(TradebenchError::invariant(format!(
                    "bar at {} arrived after bar at {}",
                    candle.timestamp, last
                )));
            }
        }
        self.last_time = Some(candle.timestamp);

        let level_hit = self.open.as_ref().and_then(|t| {
            let p = &t.position;
            if p.stop_touched(candle) {
                Some((p.stop_loss, ExitReason::StopLoss))
            } else if p.target_touched(candle) {
                Some((p.take_profit, ExitReason::TakeProfit))
            } else {
                None
            }
        });
        if let Some((price, reason)) = level_hit {
            self.close(price, candle.timestamp, reason)?;
        }

        let exits_open = match (&self.open, signal.direction) {
            (Some(_), Direction::Close) => true,
            (Some(t), Direction::Long) => t.position.side == Side::Short,
            (Some(t), Direction::Short) => t.position.side == Side::Long,
            _ => false,
        };
        if exits_open {
            self.close(signal.price, candle.timestamp, ExitReason::Signal)?;
            return Ok(());
        }

        if self.open.is_none() {
            let side = match signal.direction {
                Direction::Long => Some(Side::Long),
                Direction::Short => Some(Side::Short),
                Direction::Close | Direction::None => None,
            };
            if let Some(side) = side {
                self.enter(side, signal, candle.timestamp)?;
            }
        }
        Ok(())
    }

    /// Force-close any open position at the last bar's close.
    pub fn finish(&mut self, last: &Candle) -> Result<(), TradebenchError> {
        if self.open.is_some() {
            self.close(last.close, last.timestamp, ExitReason::ForcedExit)?;
        }
        Ok(())
    }

    pub fn into_ledger(self) -> Result<Ledger, TradebenchError> {
        if let Some(t) = &self.open {
            return Err(TradebenchError::invariant(format!(
                "{} position opened at {} still open at end of run",
                self.symbol, t.position.entry_time
            )));
        }
        Ok(Ledger {
            trades: self.trades,
            equity_curve: self.equity_curve,
            final_balance: self.balance,
        })
    }

    fn enter(&mut self, side: Side, signal: &Signal, time: NaiveDateTime) -> Result<(), TradebenchError> {
        if self.open.is_some() {
            return Err(TradebenchError::invariant(format!(
                "second {} position opened at {} while one is open",
                self.symbol, time
            )));
        }

        let entry = signal.price;
        let stop = match side {
            Side::Long => entry * (1.0 - self.risk.stop_loss),
            Side::Short => entry * (1.0 + self.risk.stop_loss),
        };
        let size = recommend_size(self.balance, self.risk.risk_fraction, entry, stop);
        if !size.is_finite() || size <= 0.0 {
            tracing::warn!(
                symbol = %self.symbol,
                %time,
                entry,
                balance = self.balance,
                "skipping entry with non-positive size"
            );
            return Ok(());
        }

        let position = SimulatedPosition::open(
            self.symbol.clone(),
            side,
            entry,
            time,
            size,
            self.risk.stop_loss,
            self.risk.take_profit,
        );
        let warnings = self.risk_manager.validate(&position.plan(), self.balance);
        for w in &warnings {
            tracing::debug!(symbol = %self.symbol, %time, warning = %w, "risk warning");
        }
        tracing::debug!(
            symbol = %self.symbol,
            %side,
            %time,
            entry,
            size,
            stop = position.stop_loss,
            target = position.take_profit,
            "position opened"
        );

        self.open = Some(OpenTrade {
            position,
            confidence: signal.confidence,
            warnings,
            metadata: signal.metadata.clone(),
        });
        Ok(())
    }

    fn close(&mut self, price: f64, time: NaiveDateTime, reason: ExitReason) -> Result<(), TradebenchError> {
        let Some(mut trade) = self.open.take() else {
            return Err(TradebenchError::invariant(format!(
                "close requested at {} with no open position",
                time
            )));
        };
        let profit = trade.position.close(price, time)?;
        self.balance += profit;

        if reason == ExitReason::ForcedExit {
            trade.metadata.insert("forced_exit".to_string(), "true".to_string());
        }
        let p = trade.position;
        tracing::debug!(
            symbol = %self.symbol,
            side = %p.side,
            %time,
            price,
            profit,
            ?reason,
            "position closed"
        );

        self.trades.push(TradeRecord {
            symbol: p.symbol,
            side: p.side,
            entry_price: p.entry_price,
            entry_time: p.entry_time,
            exit_price: price,
            exit_time: time,
            size: p.size,
            stop_loss: p.stop_loss,
            take_profit: p.take_profit,
            profit,
            exit_reason: reason,
            confidence: trade.confidence,
            risk_warnings: trade.warnings,
            metadata: trade.metadata,
        });
        self.equity_curve.push(EquityPoint {
            timestamp: time,
            balance: self.balance,
        });
        Ok(())
    }
}
