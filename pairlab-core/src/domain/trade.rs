//! RoundTrip: a completed flat → open → flat cycle of the pair book.

use super::ids::OrderId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One completed round trip.
///
/// A round trip starts with the first fill that takes the book away from
/// flat and ends with the fill that brings every position back to zero.
/// For a pair trade that covers both legs on entry and both legs on exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    /// Symbols touched during the round trip, in first-fill order.
    pub symbols: Vec<String>,
    pub fill_count: usize,
    pub order_ids: Vec<OrderId>,
    /// Sum of realized PnL across legs, before commission.
    pub gross_pnl: f64,
    pub commission: f64,
    /// Sum of fill cash flows: `gross_pnl - commission`.
    pub net_pnl: f64,
    /// Largest absolute notional committed at any point during the trip.
    pub max_notional: f64,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    /// Net PnL as a fraction of the peak notional committed.
    pub fn return_pct(&self) -> f64 {
        if self.max_notional <= 0.0 {
            return 0.0;
        }
        self.net_pnl / self.max_notional
    }

    /// Calendar days between the first and last fill.
    pub fn days_held(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RoundTrip {
        RoundTrip {
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            symbols: vec!["AAA".into(), "BBB".into()],
            fill_count: 4,
            order_ids: vec![OrderId(1), OrderId(2), OrderId(3), OrderId(4)],
            gross_pnl: 204.0,
            commission: 4.0,
            net_pnl: 200.0,
            max_notional: 10_000.0,
        }
    }

    #[test]
    fn winner_and_return() {
        let trip = sample();
        assert!(trip.is_winner());
        assert!((trip.return_pct() - 0.02).abs() < 1e-12);
        assert_eq!(trip.days_held(), 10);
    }

    #[test]
    fn commission_can_turn_a_flat_trade_into_a_loser() {
        let trip = RoundTrip {
            gross_pnl: 0.0,
            net_pnl: -4.0,
            ..sample()
        };
        assert!(!trip.is_winner());
    }
}
