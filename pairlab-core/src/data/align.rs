//! Pair time alignment.
//!
//! Given bars for two symbols, align them onto the union of their dates.
//! A symbol with no bar on a date gets an explicit gap (`None`); prices are
//! never forward-filled.

use super::provider::RawBar;
use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Bar data for several symbols on a common timeline.
#[derive(Debug, Clone, Default)]
pub struct AlignedData {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// Bars per symbol, one slot per entry of `dates`.
    pub bars: BTreeMap<String, Vec<Option<Bar>>>,
    /// Symbols in the order they were supplied.
    pub symbols: Vec<String>,
}

impl AlignedData {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of (symbol, date) slots with no bar.
    pub fn gap_count(&self) -> usize {
        self.bars
            .values()
            .map(|slots| slots.iter().filter(|b| b.is_none()).count())
            .sum()
    }

    /// Keep only dates up to and including `last`.
    pub fn truncate_after(&self, last: NaiveDate) -> AlignedData {
        let keep = self.dates.iter().take_while(|d| **d <= last).count();
        AlignedData {
            dates: self.dates[..keep].to_vec(),
            bars: self
                .bars
                .iter()
                .map(|(sym, slots)| (sym.clone(), slots[..keep.min(slots.len())].to_vec()))
                .collect(),
            symbols: self.symbols.clone(),
        }
    }
}

/// Align symbols to a common timeline.
///
/// Bars with any non-finite OHLC value count as missing.
pub fn align_symbols(symbol_bars: Vec<(String, Vec<RawBar>)>) -> AlignedData {
    let dates: Vec<NaiveDate> = symbol_bars
        .iter()
        .flat_map(|(_, bars)| bars.iter().map(|b| b.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut aligned = BTreeMap::new();
    let mut symbols = Vec::with_capacity(symbol_bars.len());
    for (symbol, bars) in symbol_bars {
        let by_date: BTreeMap<NaiveDate, RawBar> = bars
            .into_iter()
            .filter(RawBar::is_finite)
            .map(|b| (b.date, b))
            .collect();
        let slots = dates
            .iter()
            .map(|date| by_date.get(date).cloned().map(|b| b.into_bar(&symbol)))
            .collect();
        aligned.insert(symbol.clone(), slots);
        symbols.push(symbol);
    }

    AlignedData {
        dates,
        bars: aligned,
        symbols,
    }
}

/// Build aligned data directly from fully-formed bars (fixtures, tests).
pub fn align_bars(symbol_bars: Vec<(String, Vec<Bar>)>) -> AlignedData {
    align_symbols(
        symbol_bars
            .into_iter()
            .map(|(sym, bars)| {
                let raw = bars
                    .into_iter()
                    .map(|b| RawBar {
                        date: b.date,
                        open: b.open,
                        high: b.high,
                        low: b.low,
                        close: b.close,
                        volume: b.volume,
                        adj_close: b.close,
                    })
                    .collect();
                (sym, raw)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> RawBar {
        RawBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
            adj_close: close,
        }
    }

    #[test]
    fn align_marks_missing_as_gap() {
        let aligned = align_symbols(vec![
            (
                "SPY".into(),
                vec![
                    bar("2024-01-02", 100.0),
                    bar("2024-01-03", 101.0),
                    bar("2024-01-04", 102.0),
                ],
            ),
            (
                "QQQ".into(),
                vec![bar("2024-01-02", 200.0), bar("2024-01-04", 202.0)],
            ),
        ]);

        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned.symbols, vec!["SPY".to_string(), "QQQ".to_string()]);
        assert_eq!(aligned.bars["SPY"][1].as_ref().unwrap().close, 101.0);
        assert!(aligned.bars["QQQ"][1].is_none());
        assert_eq!(aligned.gap_count(), 1);
    }

    #[test]
    fn non_finite_bars_become_gaps() {
        let mut broken = bar("2024-01-03", 5.0);
        broken.close = f64::NAN;
        let aligned = align_symbols(vec![(
            "SPY".into(),
            vec![bar("2024-01-02", 4.0), broken],
        )]);
        assert_eq!(aligned.len(), 2);
        assert!(aligned.bars["SPY"][1].is_none());
    }

    #[test]
    fn truncate_keeps_prefix() {
        let aligned = align_symbols(vec![(
            "SPY".into(),
            vec![
                bar("2024-01-02", 1.0),
                bar("2024-01-03", 2.0),
                bar("2024-01-04", 3.0),
            ],
        )]);
        let cut = aligned.truncate_after(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.bars["SPY"].len(), 2);
    }
}
