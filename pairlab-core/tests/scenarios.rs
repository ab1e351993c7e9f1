//! End-to-end runs of the pair backtester:
//!
//! - spread shock: exactly one entry, exactly one exit, flat afterwards
//! - short history: no signals, equity equals initial capital
//! - capital rejection: no orders, book untouched
//! - data gap: the other leg's history is not shifted, no signal that day
//! - known round trips: trade count, win rate, total return

use chrono::{Duration, NaiveDate};
use pairlab_core::data::{align_bars, AlignedData, DataHandler, HistoricBarHandler};
use pairlab_core::domain::{
    Bar, Event, EventKind, FillEvent, OrderId, OrderSide, PairId, PortfolioState, SignalType,
};
use pairlab_core::engine::{extract_round_trips, run_backtest, EngineConfig};
use pairlab_core::metrics::{PerformanceMetrics, DEFAULT_ANNUALIZATION};
use pairlab_core::portfolio::RejectReason;
use pairlab_core::strategy::{PairsConfig, PairsTradingStrategy, Strategy};

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
}

fn bar(symbol: &str, i: usize, close: f64) -> Bar {
    Bar {
        symbol: symbol.into(),
        date: day(i),
        open: close,
        high: close,
        low: close,
        close,
        volume: 10_000,
    }
}

/// B tracks twice A's base level; A gets +1 on `shock` timestamps.
fn shocked_pair(n: usize, shock: std::ops::Range<usize>) -> AlignedData {
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for t in 0..n {
        let x = t as f64;
        let base = 50.0 + 5.0 * (0.3 * x).sin();
        let bump = if shock.contains(&t) { 1.0 } else { 0.0 };
        a.push(bar("AAA", t, base + bump));
        b.push(bar("BBB", t, 2.0 * base + 0.02 * (1.7 * x).sin()));
    }
    align_bars(vec![("AAA".into(), a), ("BBB".into(), b)])
}

fn config(lookback: usize) -> EngineConfig {
    EngineConfig::new(PairId::new("AAA", "BBB"), 100_000.0).with_strategy(PairsConfig {
        lookback,
        z_entry: 2.0,
        z_exit: 0.5,
        ..PairsConfig::default()
    })
}

fn signal_types(events: &[Event]) -> Vec<(NaiveDate, SignalType)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Signal(s) => Some((s.timestamp, s.signal_type)),
            _ => None,
        })
        .collect()
}

// ──────────────────────────────────────────────
// Spread shock
// ──────────────────────────────────────────────

#[test]
fn shock_produces_one_entry_and_one_exit() {
    let result = run_backtest(&shocked_pair(100, 60..63), &config(20)).unwrap();

    let signals = signal_types(&result.events);
    assert_eq!(
        signals,
        vec![(day(60), SignalType::Short), (day(63), SignalType::Exit)]
    );
    assert!(result.rejections.is_empty());
    assert!(result.final_state.is_flat());
    assert!(result.final_state.positions.is_empty());
    assert_eq!(result.fills.len(), 4);
    assert_eq!(result.round_trips.len(), 1);
    assert_eq!(result.metrics.total_trades, 1);

    let trip = &result.round_trips[0];
    assert_eq!(trip.entry_date, day(61));
    assert_eq!(trip.exit_date, day(64));
    assert_eq!(trip.commission, 4.0);
}

#[test]
fn shock_entry_shorts_a_and_buys_b() {
    let result = run_backtest(&shocked_pair(100, 60..63), &config(20)).unwrap();
    let entry: Vec<&FillEvent> = result.fills.iter().take(2).collect();
    let a = entry.iter().find(|f| f.symbol == "AAA").unwrap();
    let b = entry.iter().find(|f| f.symbol == "BBB").unwrap();
    assert_eq!(a.side, OrderSide::Sell);
    assert_eq!(b.side, OrderSide::Buy);
    // beta is about 0.49, so leg B is roughly half of leg A in units.
    let ratio = b.quantity / a.quantity;
    assert!((ratio - 0.49).abs() < 0.02, "ratio {ratio}");
}

// ──────────────────────────────────────────────
// Short history
// ──────────────────────────────────────────────

#[test]
fn fewer_bars_than_lookback_never_trades() {
    let result = run_backtest(&shocked_pair(50, 40..43), &config(100)).unwrap();

    assert_eq!(result.events_of(EventKind::Signal).count(), 0);
    assert_eq!(result.counts.order, 0);
    assert!(result.fills.is_empty());
    assert_eq!(result.final_equity(), 100_000.0);
    assert_eq!(result.metrics.total_commission, 0.0);
    assert_eq!(result.metrics.total_return, 0.0);
    assert_eq!(result.diagnostics.insufficient_data, 50);
}

// ──────────────────────────────────────────────
// Capital rejection
// ──────────────────────────────────────────────

#[test]
fn entry_beyond_cash_is_rejected_without_orders() {
    let config = config(20).with_allocation(1.5);
    let result = run_backtest(&shocked_pair(100, 60..63), &config).unwrap();

    assert_eq!(result.counts.order, 0);
    assert!(result.fills.is_empty());
    assert_eq!(result.final_state, PortfolioState::new(100_000.0));
    assert!(result.equity_totals().iter().all(|e| *e == 100_000.0));

    assert!(matches!(
        result.rejections[0].reason,
        RejectReason::InsufficientCapital { required, available }
            if required > available && available == 100_000.0
    ));
    // The strategy still believes it is short, so its exit finds nothing to close.
    assert_eq!(result.rejections[1].reason, RejectReason::NoOpenPosition);
}

// ──────────────────────────────────────────────
// Data gap
// ──────────────────────────────────────────────

#[test]
fn gap_leaves_other_history_untouched() {
    let mut data = shocked_pair(40, 0..0);
    data.bars.get_mut("BBB").unwrap()[30] = None;

    let mut handler = HistoricBarHandler::new(data);
    let mut strategy = PairsTradingStrategy::new(
        PairId::new("AAA", "BBB"),
        PairsConfig {
            lookback: 20,
            ..PairsConfig::default()
        },
    )
    .unwrap();

    let mut before = None;
    while let Some(market) = handler.update_bars() {
        if market.timestamp == day(30) {
            before = Some((
                strategy.window().history_a().to_vec(),
                strategy.window().history_b().to_vec(),
            ));
            assert!(strategy.evaluate(&market).is_none());
            let after = (
                strategy.window().history_a().to_vec(),
                strategy.window().history_b().to_vec(),
            );
            assert_eq!(before.as_ref(), Some(&after));
        } else {
            strategy.evaluate(&market);
        }
    }
    assert!(before.is_some());
    assert_eq!(strategy.diagnostics().data_gaps, 1);
}

#[test]
fn gap_day_still_marks_equity() {
    let mut data = shocked_pair(100, 60..63);
    data.bars.get_mut("BBB").unwrap()[62] = None;
    let result = run_backtest(&data, &config(20)).unwrap();

    assert_eq!(result.gap_count, 1);
    assert!(signal_types(&result.events)
        .iter()
        .all(|(date, _)| *date != day(62)));
    let row = result
        .equity
        .iter()
        .find(|r| r.point.timestamp == day(62))
        .unwrap();
    let holdings: f64 = row.point.holdings.values().sum();
    assert!((row.point.total - (row.point.cash + holdings)).abs() < 1e-6);
}

// ──────────────────────────────────────────────
// Known round trips
// ──────────────────────────────────────────────

#[test]
fn twelve_known_round_trips() {
    let moves = [2.0, -1.0, 3.0, 1.0, -2.0, 1.0, -1.0, 2.0, 1.0, -3.0, 2.0, 1.0];
    let mut fills = Vec::new();
    let mut state = PortfolioState::new(100_000.0);
    let mut equity = vec![100_000.0];
    let mut order_id = 0;

    for (i, d) in moves.iter().enumerate() {
        for (side, price, date) in [
            (OrderSide::Buy, 100.0, day(2 * i)),
            (OrderSide::Sell, 100.0 + d, day(2 * i + 1)),
        ] {
            order_id += 1;
            let fill = FillEvent {
                order_id: OrderId(order_id),
                timestamp: date,
                symbol: "AAA".into(),
                side,
                quantity: 100.0,
                price,
                commission: 1.0,
            };
            state.apply_fill(&fill);
            equity.push(state.cash + state.quantity("AAA") * price);
            fills.push(fill);
        }
    }

    let trips = extract_round_trips(&fills);
    let metrics = PerformanceMetrics::compute(
        &equity,
        &trips,
        100_000.0,
        state.total_commission,
        DEFAULT_ANNUALIZATION,
    );

    assert_eq!(metrics.total_trades, 12);
    assert!((metrics.win_rate - 8.0 / 12.0).abs() < 1e-12);
    assert!((metrics.total_return - 0.00576).abs() < 1e-12);
    assert!((metrics.final_equity - 100_576.0).abs() < 1e-9);
    assert_eq!(metrics.total_commission, 24.0);
    let net: f64 = trips.iter().map(|t| t.net_pnl).sum();
    assert!((net - 576.0).abs() < 1e-9);
}
