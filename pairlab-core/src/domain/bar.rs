//! Bar: one day of OHLCV data for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// The close, when it can be used as a price (finite and positive).
    /// Anything else is treated like a missing bar by consumers.
    pub fn valid_close(&self) -> Option<f64> {
        (self.close.is_finite() && self.close > 0.0).then_some(self.close)
    }
}
