//! Equity tracker: one mark-to-market point per timestamp.

use crate::domain::PortfolioState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Snapshot of the book at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDate,
    pub cash: f64,
    /// Market value per symbol (`quantity * mark`).
    pub holdings: BTreeMap<String, f64>,
    /// Signed quantity per symbol.
    pub positions: BTreeMap<String, f64>,
    /// Cumulative commission paid up to this point.
    pub commission: f64,
    pub total: f64,
}

/// Reporting row: an equity point plus its period return and cumulative multiple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityRow {
    #[serde(flatten)]
    pub point: EquityPoint,
    /// Simple return versus the previous row (0 for the first row).
    #[serde(rename = "returns")]
    pub period_return: f64,
    /// `total / initial_capital`.
    pub equity_curve: f64,
}

#[derive(Debug, Clone)]
pub struct EquityTracker {
    initial_capital: f64,
    points: BTreeMap<NaiveDate, EquityPoint>,
}

impl EquityTracker {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            points: BTreeMap::new(),
        }
    }

    /// Record (or refresh) the point for `timestamp` from the current book.
    pub fn record(
        &mut self,
        timestamp: NaiveDate,
        state: &PortfolioState,
        marks: &BTreeMap<String, f64>,
    ) -> &EquityPoint {
        let mut holdings = BTreeMap::new();
        let mut positions = BTreeMap::new();
        for (symbol, pos) in &state.positions {
            let mark = marks.get(symbol).copied().unwrap_or(pos.avg_entry_price);
            holdings.insert(symbol.clone(), pos.market_value(mark));
            positions.insert(symbol.clone(), pos.quantity);
        }
        let point = EquityPoint {
            timestamp,
            cash: state.cash,
            total: state.cash + holdings.values().sum::<f64>(),
            holdings,
            positions,
            commission: state.total_commission,
        };
        match self.points.entry(timestamp) {
            Entry::Occupied(mut slot) => {
                slot.insert(point);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(point),
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&EquityPoint> {
        self.points.values().next_back()
    }

    pub fn points(&self) -> impl Iterator<Item = &EquityPoint> {
        self.points.values()
    }

    /// Equity totals in timestamp order.
    pub fn totals(&self) -> Vec<f64> {
        self.points.values().map(|p| p.total).collect()
    }

    pub fn rows(&self) -> Vec<EquityRow> {
        let mut prev: Option<f64> = None;
        self.points
            .values()
            .map(|point| {
                let period_return = match prev {
                    Some(p) if p != 0.0 => point.total / p - 1.0,
                    _ => 0.0,
                };
                prev = Some(point.total);
                EquityRow {
                    period_return,
                    equity_curve: if self.initial_capital != 0.0 {
                        point.total / self.initial_capital
                    } else {
                        0.0
                    },
                    point: point.clone(),
                }
            })
            .collect()
    }
}
