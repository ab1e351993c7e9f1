//! Trade extraction: groups fills into flat → open → flat round trips.
//!
//! Post-processes fills after the event loop completes. Pure function:
//! fills in, round trips out. A round trip opens on the first fill taken from
//! a flat book and closes on the fill that returns every symbol to zero, so a
//! two-leg pair trade is one round trip.

use crate::domain::{FillEvent, OrderId, RoundTrip, QUANTITY_EPSILON};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Round trip still being accumulated.
#[derive(Debug, Clone)]
struct OpenTrip {
    entry_date: NaiveDate,
    symbols: Vec<String>,
    order_ids: Vec<OrderId>,
    fill_count: usize,
    cash_flow: f64,
    commission: f64,
    max_notional: f64,
}

impl OpenTrip {
    fn start(fill: &FillEvent) -> Self {
        Self {
            entry_date: fill.timestamp,
            symbols: Vec::new(),
            order_ids: Vec::new(),
            fill_count: 0,
            cash_flow: 0.0,
            commission: 0.0,
            max_notional: 0.0,
        }
    }

    fn add(&mut self, fill: &FillEvent) {
        if !self.symbols.contains(&fill.symbol) {
            self.symbols.push(fill.symbol.clone());
        }
        if !self.order_ids.contains(&fill.order_id) {
            self.order_ids.push(fill.order_id);
        }
        self.fill_count += 1;
        self.cash_flow += fill.cash_delta();
        self.commission += fill.commission;
    }

    fn close(self, exit_date: NaiveDate) -> RoundTrip {
        RoundTrip {
            entry_date: self.entry_date,
            exit_date,
            symbols: self.symbols,
            fill_count: self.fill_count,
            order_ids: self.order_ids,
            gross_pnl: self.cash_flow + self.commission,
            commission: self.commission,
            net_pnl: self.cash_flow,
            max_notional: self.max_notional,
        }
    }
}

/// Extract completed round trips from fills in processing order.
///
/// Fills after the last flat point (an open trip at end of data) are not
/// reported as a round trip.
pub fn extract_round_trips(fills: &[FillEvent]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut book: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    let mut open: Option<OpenTrip> = None;

    for fill in fills {
        let trip = open.get_or_insert_with(|| OpenTrip::start(fill));
        trip.add(fill);

        let entry = book.entry(fill.symbol.as_str()).or_insert((0.0, fill.price));
        entry.0 += fill.signed_quantity();
        entry.1 = fill.price;

        let notional: f64 = book.values().map(|(qty, px)| qty.abs() * px).sum();
        trip.max_notional = trip.max_notional.max(notional);

        if book.values().all(|(qty, _)| qty.abs() <= QUANTITY_EPSILON) {
            book.clear();
            if let Some(done) = open.take() {
                trips.push(done.close(fill.timestamp));
            }
        }
    }
    trips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use chrono::Duration;

    fn fill(id: u64, day: i64, symbol: &str, side: OrderSide, qty: f64, price: f64) -> FillEvent {
        FillEvent {
            order_id: OrderId(id),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day),
            symbol: symbol.into(),
            side,
            quantity: qty,
            price,
            commission: 1.0,
        }
    }

    #[test]
    fn single_symbol_round_trip() {
        let fills = vec![
            fill(1, 0, "AAA", OrderSide::Buy, 100.0, 100.0),
            fill(2, 5, "AAA", OrderSide::Sell, 100.0, 102.0),
        ];
        let trips = extract_round_trips(&fills);
        assert_eq!(trips.len(), 1);
        assert!((trips[0].net_pnl - 198.0).abs() < 1e-9);
        assert!((trips[0].gross_pnl - 200.0).abs() < 1e-9);
        assert_eq!(trips[0].commission, 2.0);
        assert_eq!(trips[0].fill_count, 2);
        assert_eq!(trips[0].days_held(), 5);
    }

    #[test]
    fn pair_legs_form_one_round_trip() {
        let fills = vec![
            fill(1, 1, "AAA", OrderSide::Sell, 100.0, 50.0),
            fill(2, 1, "BBB", OrderSide::Buy, 50.0, 100.0),
            fill(3, 4, "AAA", OrderSide::Buy, 100.0, 48.0),
            fill(4, 4, "BBB", OrderSide::Sell, 50.0, 99.0),
        ];
        let trips = extract_round_trips(&fills);
        assert_eq!(trips.len(), 1);
        // A: +200, B: -50, commission 4
        assert!((trips[0].net_pnl - 146.0).abs() < 1e-9);
        assert_eq!(trips[0].symbols, vec!["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(trips[0].max_notional, 10_000.0);
        assert!(trips[0].is_winner());
    }

    #[test]
    fn open_trip_at_end_is_not_reported() {
        let fills = vec![
            fill(1, 0, "AAA", OrderSide::Buy, 10.0, 10.0),
            fill(2, 1, "AAA", OrderSide::Sell, 10.0, 11.0),
            fill(3, 2, "AAA", OrderSide::Buy, 10.0, 12.0),
        ];
        assert_eq!(extract_round_trips(&fills).len(), 1);
    }

    #[test]
    fn partial_exit_keeps_trip_open() {
        let fills = vec![
            fill(1, 0, "AAA", OrderSide::Buy, 10.0, 10.0),
            fill(2, 1, "AAA", OrderSide::Sell, 4.0, 11.0),
            fill(3, 2, "AAA", OrderSide::Sell, 6.0, 9.0),
        ];
        let trips = extract_round_trips(&fills);
        assert_eq!(trips.len(), 1);
        // -100 + 44 + 54 - 3 commission
        assert!((trips[0].net_pnl - (-5.0)).abs() < 1e-9);
        assert_eq!(trips[0].fill_count, 3);
    }
}
