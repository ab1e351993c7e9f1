//! Pair sizing: hedge-ratio weighted leg quantities from an equity budget.
//!
//! Gross notional `G = allocation * equity`. One spread unit costs
//! `P_A + |beta| * P_B`, so `N = G / (P_A + |beta| * P_B)` units are bought:
//! `qty_A = floor(N)` and `qty_B = floor(|beta| * N)`.

use crate::domain::{OrderSide, SignalType};

/// Planned quantities and sides for both legs of an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSizing {
    pub side_a: OrderSide,
    pub qty_a: f64,
    pub side_b: OrderSide,
    pub qty_b: f64,
    /// `qty_A * P_A + qty_B * P_B`.
    pub gross_notional: f64,
}

/// Size an entry. Returns `None` for an exit signal or unusable inputs.
///
/// A long spread buys A and sells B when `beta > 0` (buys B when `beta < 0`);
/// a short spread mirrors it.
pub fn size_pair(
    signal: SignalType,
    beta: f64,
    price_a: f64,
    price_b: f64,
    equity: f64,
    allocation: f64,
) -> Option<PairSizing> {
    let side_a = match signal {
        SignalType::Long => OrderSide::Buy,
        SignalType::Short => OrderSide::Sell,
        SignalType::Exit => return None,
    };
    let unit_cost = price_a + beta.abs() * price_b;
    if !(unit_cost.is_finite() && unit_cost > 0.0 && equity.is_finite() && equity > 0.0) {
        return None;
    }

    let units = allocation * equity / unit_cost;
    let qty_a = units.floor();
    let qty_b = (beta.abs() * units).floor();
    let side_b = if beta >= 0.0 {
        side_a.opposite()
    } else {
        side_a
    };

    Some(PairSizing {
        side_a,
        qty_a,
        side_b,
        qty_b,
        gross_notional: qty_a * price_a + qty_b * price_b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_spread_positive_beta() {
        // G = 0.5 * 100_000 = 50_000; unit = 50 + 0.5 * 100 = 100; N = 500
        let s = size_pair(SignalType::Long, 0.5, 50.0, 100.0, 100_000.0, 0.5).unwrap();
        assert_eq!(s.side_a, OrderSide::Buy);
        assert_eq!(s.qty_a, 500.0);
        assert_eq!(s.side_b, OrderSide::Sell);
        assert_eq!(s.qty_b, 250.0);
        assert_eq!(s.gross_notional, 50_000.0);
    }

    #[test]
    fn short_spread_negative_beta_sells_both() {
        let s = size_pair(SignalType::Short, -2.0, 30.0, 10.0, 10_000.0, 1.0).unwrap();
        // unit = 30 + 20 = 50; N = 200
        assert_eq!(s.side_a, OrderSide::Sell);
        assert_eq!(s.side_b, OrderSide::Sell);
        assert_eq!(s.qty_a, 200.0);
        assert_eq!(s.qty_b, 400.0);
    }

    #[test]
    fn quantities_are_floored() {
        let s = size_pair(SignalType::Long, 0.3, 33.0, 71.0, 10_000.0, 0.5).unwrap();
        let units: f64 = 5_000.0 / (33.0 + 0.3 * 71.0);
        assert_eq!(s.qty_a, units.floor());
        assert_eq!(s.qty_b, (0.3 * units).floor());
        assert!(s.gross_notional <= 5_000.0);
    }

    #[test]
    fn exit_and_bad_prices_are_not_sized() {
        assert!(size_pair(SignalType::Exit, 0.5, 50.0, 100.0, 1e5, 0.5).is_none());
        assert!(size_pair(SignalType::Long, 0.5, f64::NAN, 100.0, 1e5, 0.5).is_none());
        assert!(size_pair(SignalType::Long, 0.5, 50.0, 100.0, 0.0, 0.5).is_none());
    }
}
