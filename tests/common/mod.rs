#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tradebench::domain::backtest::BacktestConfig;
pub use tradebench::domain::candle::Candle;
use tradebench::domain::error::TradebenchError;
use tradebench::domain::strategy::{RiskParams, Strategy, StrategyKind};
use tradebench::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, TradebenchError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradebenchError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|candles| {
                candles
                    .iter()
                    .filter(|c| c.timestamp >= start && c.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self, _timeframe: &str) -> Result<Vec<String>, TradebenchError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly candles with open at the close and a half-point wick each side.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start_time() + Duration::hours(i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// 25 flat bars at 100, then a +2/-1 zig-zag climb ending at 114.
pub fn climb_closes() -> Vec<f64> {
    let mut closes = vec![100.0; 25];
    let mut price = 100.0;
    for k in 0..25 {
        price += if k % 2 == 0 { 2.0 } else { -1.0 };
        closes.push(price);
    }
    closes
}

/// Deterministic wave with drift, long enough for every default strategy.
pub fn wave_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            100.0 + 8.0 * (x / 9.0).sin() + 3.0 * (x / 3.7).cos() + 0.05 * x
        })
        .collect()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig::new(
        "TEST",
        "1h",
        start_time(),
        start_time() + Duration::days(365),
        10_000.0,
    )
}

pub fn strategy(type_name: &str, risk: RiskParams) -> Strategy {
    Strategy::new(type_name, StrategyKind::from_type(type_name).unwrap(), risk).unwrap()
}

pub fn ema_strategy(take_profit: f64) -> Strategy {
    strategy(
        "ema_crossover",
        RiskParams {
            risk_fraction: 0.02,
            stop_loss: 0.02,
            take_profit,
        },
    )
}

pub fn write_csv(dir: &Path, symbol: &str, timeframe: &str, candles: &[Candle]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for c in candles {
        writeln!(
            content,
            "{},{},{},{},{},{}",
            c.timestamp.format("%Y-%m-%d %H:%M:%S"),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{}_{}.csv", symbol, timeframe)), content).unwrap();
}
