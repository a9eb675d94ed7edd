//! Directional trading signals.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    Close,
    None,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::Close => "CLOSE",
            Direction::None => "NONE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub confidence: f64,
    pub metadata: BTreeMap<String, String>,
}

impl Signal {
    pub fn new(
        timestamp: NaiveDateTime,
        symbol: impl Into<String>,
        direction: Direction,
        price: f64,
        confidence: f64,
    ) -> Self {
        Signal {
            timestamp,
            symbol: symbol.into(),
            direction,
            price,
            confidence: confidence.clamp(0.0, 1.0),
            metadata: BTreeMap::new(),
        }
    }

    /// A NONE signal with zero confidence.
    pub fn none(timestamp: NaiveDateTime, symbol: impl Into<String>, price: f64) -> Self {
        Signal::new(timestamp, symbol, Direction::None, price, 0.0)
    }

    pub fn with_meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_entry(&self) -> bool {
        matches!(self.direction, Direction::Long | Direction::Short)
    }
}
