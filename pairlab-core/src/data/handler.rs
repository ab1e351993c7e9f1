//! Data handler: replays aligned bars one timestamp at a time.
//!
//! Only bars already released through `update_bars` are visible to
//! `get_latest_bar`; nothing ahead of the cursor can be observed.

use super::align::AlignedData;
use crate::domain::{Bar, MarketEvent};
use std::collections::BTreeMap;

/// Pull interface over time-ordered market data.
pub trait DataHandler {
    fn symbols(&self) -> &[String];

    fn has_more_data(&self) -> bool;

    /// Release the next timestamp as a market event.
    fn update_bars(&mut self) -> Option<MarketEvent>;

    /// Most recent bar released for `symbol`.
    fn get_latest_bar(&self, symbol: &str) -> Option<&Bar>;
}

/// Replays an in-memory `AlignedData` from start to end.
#[derive(Debug, Clone)]
pub struct HistoricBarHandler {
    data: AlignedData,
    cursor: usize,
    latest: BTreeMap<String, Bar>,
}

impl HistoricBarHandler {
    pub fn new(data: AlignedData) -> Self {
        Self {
            data,
            cursor: 0,
            latest: BTreeMap::new(),
        }
    }

    pub fn data(&self) -> &AlignedData {
        &self.data
    }

    /// Timestamps released so far.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl DataHandler for HistoricBarHandler {
    fn symbols(&self) -> &[String] {
        &self.data.symbols
    }

    fn has_more_data(&self) -> bool {
        self.cursor < self.data.dates.len()
    }

    fn update_bars(&mut self) -> Option<MarketEvent> {
        let timestamp = *self.data.dates.get(self.cursor)?;
        let idx = self.cursor;
        self.cursor += 1;

        let mut bars = BTreeMap::new();
        for symbol in &self.data.symbols {
            let bar = self
                .data
                .bars
                .get(symbol)
                .and_then(|slots| slots.get(idx))
                .cloned()
                .flatten();
            if let Some(bar) = &bar {
                self.latest.insert(symbol.clone(), bar.clone());
            }
            bars.insert(symbol.clone(), bar);
        }
        Some(MarketEvent { timestamp, bars })
    }

    fn get_latest_bar(&self, symbol: &str) -> Option<&Bar> {
        self.latest.get(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::align::align_bars;
    use chrono::{Duration, NaiveDate};

    fn bars(symbol: &str, closes: &[(i64, f64)]) -> Vec<Bar> {
        closes
            .iter()
            .map(|(day, c)| Bar {
                symbol: symbol.into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(*day),
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: 1,
            })
            .collect()
    }

    fn handler() -> HistoricBarHandler {
        HistoricBarHandler::new(align_bars(vec![
            ("AAA".into(), bars("AAA", &[(0, 1.0), (1, 2.0), (2, 3.0)])),
            ("BBB".into(), bars("BBB", &[(0, 10.0), (2, 30.0)])),
        ]))
    }

    #[test]
    fn replays_in_order_with_gaps() {
        let mut h = handler();
        assert!(h.has_more_data());
        let first = h.update_bars().unwrap();
        assert!(first.is_complete());

        let second = h.update_bars().unwrap();
        assert_eq!(second.close("AAA"), Some(2.0));
        assert_eq!(second.close("BBB"), None);
        assert!(second.timestamp > first.timestamp);

        h.update_bars().unwrap();
        assert!(!h.has_more_data());
        assert!(h.update_bars().is_none());
    }

    #[test]
    fn latest_bar_never_looks_ahead() {
        let mut h = handler();
        assert!(h.get_latest_bar("AAA").is_none());
        h.update_bars();
        h.update_bars();
        assert_eq!(h.get_latest_bar("AAA").unwrap().close, 2.0);
        // BBB had a gap: latest stays at the first bar.
        assert_eq!(h.get_latest_bar("BBB").unwrap().close, 10.0);
        assert!(h.get_latest_bar("ZZZ").is_none());
    }
}
