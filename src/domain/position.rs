//! Simulated positions, closed-trade records and equity points.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;
use crate::domain::risk::TradePlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    ForcedExit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedPosition {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub status: PositionStatus,
    pub exit_price: Option<f64>,
    pub exit_time: Option<NaiveDateTime>,
    pub realized_profit: Option<f64>,
}

impl SimulatedPosition {
    /// Stop and target are fractional offsets from the entry price.
    pub fn open(
        symbol: impl Into<String>,
        side: Side,
        entry_price: f64,
        entry_time: NaiveDateTime,
        size: f64,
        stop_fraction: f64,
        target_fraction: f64,
    ) -> Self {
        let (stop_loss, take_profit) = match side {
            Side::Long => (
                entry_price * (1.0 - stop_fraction),
                entry_price * (1.0 + target_fraction),
            ),
            Side::Short => (
                entry_price * (1.0 + stop_fraction),
                entry_price * (1.0 - target_fraction),
            ),
        };
        SimulatedPosition {
            symbol: symbol.into(),
            side,
            entry_price,
            entry_time,
            size,
            stop_loss,
            take_profit,
            status: PositionStatus::Open,
            exit_price: None,
            exit_time: None,
            realized_profit: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// sign * (price - entry) * size
    pub fn profit_at(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) * self.size
    }

    pub fn stop_touched(&self, candle: &Candle) -> bool {
        match self.side {
            Side::Long => candle.low <= self.stop_loss,
            Side::Short => candle.high >= self.stop_loss,
        }
    }

    pub fn target_touched(&self, candle: &Candle) -> bool {
        match self.side {
            Side::Long => candle.high >= self.take_profit,
            Side::Short => candle.low <= self.take_profit,
        }
    }

    pub fn plan(&self) -> TradePlan {
        TradePlan {
            entry: self.entry_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            size: self.size,
        }
    }

    /// Mark the position closed and return its realized profit.
    pub fn close(&mut self, price: f64, time: NaiveDateTime) -> Result<f64, TradebenchError> {
        if !self.is_open() {
            return Err(TradebenchError::invariant(format!(
                "{} position opened at {} closed twice",
                self.symbol, self.entry_time
            )));
        }
        if time < self.entry_time {
            return Err(TradebenchError::invariant(format!(
                "{} exit time {} precedes entry time {}",
                self.symbol, time, self.entry_time
            )));
        }
        let profit = self.profit_at(price);
        self.status = PositionStatus::Closed;
        self.exit_price = Some(price);
        self.exit_time = Some(time);
        self.realized_profit = Some(profit);
        Ok(profit)
    }
}

/// Immutable record of a closed position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_time: NaiveDateTime,
    pub size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub profit: f64,
    pub exit_reason: ExitReason,
    pub confidence: f64,
    pub risk_warnings: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl TradeRecord {
    pub fn holding_secs(&self) -> i64 {
        (self.exit_time - self.entry_time).num_seconds()
    }

    pub fn is_forced_exit(&self) -> bool {
        self.exit_reason == ExitReason::ForcedExit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub balance: f64,
}
