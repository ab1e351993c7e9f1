//! Integration tests for the engine event loop.
//!
//! Tests:
//! 1. Event ordering: MARKET fan-out, SIGNAL → ORDER → FILL within one timestamp
//! 2. Equity accounting: total == cash + holdings at every recorded point
//! 3. Parked orders at end of data are reported, not filled
//! 4. Commission: percent and fixed models flow into fills and cash

use chrono::{Duration, NaiveDate};
use pairlab_core::data::{align_bars, AlignedData};
use pairlab_core::domain::{Bar, Event, EventKind, PairId, SignalType};
use pairlab_core::engine::{run_backtest, EngineConfig};
use pairlab_core::execution::{CommissionModel, FillPolicy};
use pairlab_core::strategy::PairsConfig;

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 3, 1).unwrap() + Duration::days(i as i64)
}

/// Helper: A and B share a sine base; B's open sits slightly below its close.
fn make_pair(n: usize, shocks: &[(usize, usize)]) -> AlignedData {
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for t in 0..n {
        let x = t as f64;
        let base = 50.0 + 5.0 * (0.3 * x).sin();
        let bump = if shocks.iter().any(|(lo, hi)| (*lo..*hi).contains(&t)) {
            1.0
        } else {
            0.0
        };
        let pa = base + bump;
        let pb = 2.0 * base + 0.02 * (1.7 * x).sin();
        a.push(Bar {
            symbol: "AAA".into(),
            date: day(t),
            open: pa - 0.05,
            high: pa + 0.2,
            low: pa - 0.2,
            close: pa,
            volume: 5_000,
        });
        b.push(Bar {
            symbol: "BBB".into(),
            date: day(t),
            open: pb - 0.1,
            high: pb + 0.4,
            low: pb - 0.4,
            close: pb,
            volume: 5_000,
        });
    }
    align_bars(vec![("AAA".into(), a), ("BBB".into(), b)])
}

fn config() -> EngineConfig {
    EngineConfig::new(PairId::new("AAA", "BBB"), 50_000.0).with_strategy(PairsConfig {
        lookback: 20,
        ..PairsConfig::default()
    })
}

// ──────────────────────────────────────────────
// Event ordering
// ──────────────────────────────────────────────

#[test]
fn signal_bar_close_chain_stays_inside_one_timestamp() {
    let config = config().with_fill_policy(FillPolicy::SignalBarClose);
    let result = run_backtest(&make_pair(100, &[(60, 63)]), &config).unwrap();

    let start = result
        .events
        .iter()
        .position(|e| e.kind() == EventKind::Signal)
        .unwrap();
    let kinds: Vec<EventKind> = result.events[start..start + 5]
        .iter()
        .map(Event::kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Signal,
            EventKind::Order,
            EventKind::Order,
            EventKind::Fill,
            EventKind::Fill,
        ]
    );
    assert!(result.events[start..start + 5]
        .iter()
        .all(|e| e.timestamp() == day(60)));
    assert_eq!(result.events[start + 5].kind(), EventKind::Market);
}

#[test]
fn next_bar_open_fills_precede_the_next_signal() {
    let result = run_backtest(&make_pair(100, &[(60, 63)]), &config()).unwrap();

    // Market(61) is followed by the two parked entry fills.
    let market_61 = result
        .events
        .iter()
        .position(|e| matches!(e, Event::Market(m) if m.timestamp == day(61)))
        .unwrap();
    let next: Vec<EventKind> = result.events[market_61 + 1..market_61 + 3]
        .iter()
        .map(Event::kind)
        .collect();
    assert_eq!(next, vec![EventKind::Fill, EventKind::Fill]);

    for fill in result.fills.iter().filter(|f| f.timestamp == day(61)) {
        let open = result
            .events
            .iter()
            .find_map(|e| match e {
                Event::Market(m) if m.timestamp == day(61) => m.bar(&fill.symbol).map(|b| b.open),
                _ => None,
            })
            .unwrap();
        assert_eq!(fill.price, open);
    }
}

#[test]
fn no_duplicate_entries_before_exit() {
    let result = run_backtest(&make_pair(160, &[(60, 63), (110, 113)]), &config()).unwrap();
    let mut open = false;
    for event in result.events_of(EventKind::Signal) {
        let Event::Signal(signal) = event else {
            unreachable!()
        };
        match signal.signal_type {
            SignalType::Exit => {
                assert!(open, "exit while flat on {}", signal.timestamp);
                open = false;
            }
            SignalType::Long | SignalType::Short => {
                assert!(!open, "second entry on {}", signal.timestamp);
                open = true;
            }
        }
    }
}

// ──────────────────────────────────────────────
// Equity accounting
// ──────────────────────────────────────────────

#[test]
fn equity_reconciles_at_every_point() {
    let result = run_backtest(&make_pair(160, &[(60, 63), (110, 113)]), &config()).unwrap();
    assert_eq!(result.equity.len(), 160);
    for row in &result.equity {
        let holdings: f64 = row.point.holdings.values().sum();
        assert!(
            (row.point.total - (row.point.cash + holdings)).abs() < 1e-6,
            "equity accounting violated on {}",
            row.point.timestamp
        );
    }
    let last = result.equity.last().unwrap();
    assert!((last.equity_curve - last.point.total / 50_000.0).abs() < 1e-12);
    assert_eq!(result.equity[0].period_return, 0.0);
}

#[test]
fn cash_moves_only_on_fills() {
    let result = run_backtest(&make_pair(100, &[(60, 63)]), &config()).unwrap();
    let cash_delta: f64 = result.fills.iter().map(|f| f.cash_delta()).sum();
    assert!((result.final_state.cash - (50_000.0 + cash_delta)).abs() < 1e-6);
    let commission: f64 = result.fills.iter().map(|f| f.commission).sum();
    assert_eq!(result.final_state.total_commission, commission);
}

// ──────────────────────────────────────────────
// End of data
// ──────────────────────────────────────────────

#[test]
fn signal_on_last_bar_leaves_orders_unfilled() {
    // Data stops on the shock bar: the entry is signalled but never filled.
    let result = run_backtest(&make_pair(61, &[(60, 63)]), &config()).unwrap();
    assert_eq!(result.counts.signal, 1);
    assert_eq!(result.counts.order, 2);
    assert!(result.fills.is_empty());
    assert_eq!(result.unfilled_orders.len(), 2);
    assert_eq!(result.final_equity(), 50_000.0);
}

// ──────────────────────────────────────────────
// Commission
// ──────────────────────────────────────────────

#[test]
fn percent_commission_scales_with_notional() {
    let config = config().with_commission(CommissionModel::Percent { rate: 0.001 });
    let result = run_backtest(&make_pair(100, &[(60, 63)]), &config).unwrap();
    assert!(!result.fills.is_empty());
    for fill in &result.fills {
        assert!((fill.commission - 0.001 * fill.price * fill.quantity).abs() < 1e-9);
    }
}

#[test]
fn frictionless_round_trip_pnl_is_gross() {
    let config = config().with_commission(CommissionModel::frictionless());
    let result = run_backtest(&make_pair(100, &[(60, 63)]), &config).unwrap();
    let trip = &result.round_trips[0];
    assert_eq!(trip.commission, 0.0);
    assert_eq!(trip.gross_pnl, trip.net_pnl);
    assert!((result.final_equity() - (50_000.0 + trip.net_pnl)).abs() < 1e-6);
}
