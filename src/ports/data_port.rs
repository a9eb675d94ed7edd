//! Market data port.

use chrono::NaiveDateTime;

use crate::domain::candle::Candle;
use crate::domain::error::TradebenchError;

pub trait DataPort {
    /// Candles for `symbol` at `timeframe` within `[start, end]`, ordered by
    /// timestamp.
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, TradebenchError>;

    /// Symbols with data available at `timeframe`, sorted.
    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, TradebenchError>;
}
