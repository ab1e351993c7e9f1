//! Integration tests for the data pipeline using the frozen CSV pair fixture.
//!
//! AAA.csv uses lowercase headers, BBB.csv Yahoo-style headers and is missing
//! 2023-02-27. A +1 shock on AAA from 2023-04-24 opens one spread trade.

use chrono::NaiveDate;
use std::path::PathBuf;
use pairlab_core::data::{align_symbols, CsvProvider, DataError, DataProvider, DataSource};
use pairlab_core::domain::{PairId, SignalType};
use pairlab_core::engine::{run_backtest, EngineConfig};
use pairlab_core::strategy::PairsConfig;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn load_pair() -> pairlab_core::data::AlignedData {
    let provider = CsvProvider::new(fixture_dir());
    let (start, end) = (date("2023-01-01"), date("2023-12-31"));
    let a = provider.fetch("AAA", start, end).unwrap();
    let b = provider.fetch("BBB", start, end).unwrap();
    assert_eq!(a.source, DataSource::CsvImport);
    align_symbols(vec![(a.symbol, a.bars), (b.symbol, b.bars)])
}

#[test]
fn fixture_loads_with_both_header_styles() {
    let provider = CsvProvider::new(fixture_dir());
    let a = provider.fetch("AAA", date("2023-01-01"), date("2023-12-31")).unwrap();
    let b = provider.fetch("BBB", date("2023-01-01"), date("2023-12-31")).unwrap();

    assert_eq!(a.bars.len(), 120);
    assert_eq!(b.bars.len(), 119);
    assert_eq!(a.bars[0].date, date("2023-01-02"));
    assert_eq!(b.bars[0].close, 100.0);
    assert_eq!(b.bars[0].volume, 2_000_000);
    assert!(a.bars.windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn fetch_clips_to_requested_range() {
    let provider = CsvProvider::new(fixture_dir());
    let bars = provider
        .fetch("AAA", date("2023-01-03"), date("2023-01-06"))
        .unwrap()
        .bars;
    assert_eq!(bars.len(), 4);
    assert_eq!(bars[0].date, date("2023-01-03"));
    assert_eq!(bars[3].date, date("2023-01-06"));
}

#[test]
fn unknown_symbol_is_reported() {
    let provider = CsvProvider::new(fixture_dir());
    let err = provider
        .fetch("ZZZZ", date("2023-01-01"), date("2023-12-31"))
        .unwrap_err();
    assert!(matches!(err, DataError::SymbolNotFound { .. }));
}

#[test]
fn alignment_marks_missing_day_as_gap() {
    let aligned = load_pair();
    assert_eq!(aligned.len(), 120);
    assert_eq!(aligned.gap_count(), 1);
    let idx = aligned
        .dates
        .iter()
        .position(|d| *d == date("2023-02-27"))
        .unwrap();
    assert!(aligned.bars["BBB"][idx].is_none());
    assert!(aligned.bars["AAA"][idx].is_some());
}

#[test]
fn csv_pair_backtest_trades_the_shock() {
    let config = EngineConfig::new(PairId::new("AAA", "BBB"), 100_000.0).with_strategy(
        PairsConfig {
            lookback: 20,
            ..PairsConfig::default()
        },
    );
    let result = run_backtest(&load_pair(), &config).unwrap();

    let signals: Vec<_> = result
        .events
        .iter()
        .filter_map(|e| match e {
            pairlab_core::domain::Event::Signal(s) => Some((s.timestamp, s.signal_type)),
            _ => None,
        })
        .collect();
    assert_eq!(
        signals,
        vec![
            (date("2023-04-24"), SignalType::Short),
            (date("2023-04-28"), SignalType::Exit)
        ]
    );
    assert_eq!(result.gap_count, 1);
    assert_eq!(result.diagnostics.data_gaps, 1);
    assert_eq!(result.round_trips.len(), 1);
    assert_eq!(result.round_trips[0].entry_date, date("2023-04-25"));
    assert_eq!(result.round_trips[0].exit_date, date("2023-05-01"));
    assert!(result.final_state.is_flat());
}
