//! Portfolio state: cash plus all open positions.

use super::event::FillEvent;
use super::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate portfolio state.
///
/// The equity accounting identity must hold at every recorded timestamp:
/// `equity == cash + sum(quantity * mark)`. Positions are kept in a `BTreeMap`
/// so every derived series iterates symbols in the same order on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub total_commission: f64,
    /// Realized PnL across all positions, before commission.
    pub realized_pnl: f64,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            total_commission: 0.0,
            realized_pnl: 0.0,
        }
    }

    /// Total equity = cash + sum of position market values.
    ///
    /// Symbols without a mark are valued at their average entry price.
    pub fn equity(&self, marks: &BTreeMap<String, f64>) -> f64 {
        self.cash + self.positions_value(marks)
    }

    pub fn positions_value(&self, marks: &BTreeMap<String, f64>) -> f64 {
        self.positions
            .iter()
            .map(|(sym, pos)| {
                let price = marks.get(sym).copied().unwrap_or(pos.avg_entry_price);
                pos.market_value(price)
            })
            .sum()
    }

    /// Signed quantity held in `symbol` (0.0 when no position).
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.get(symbol).is_some_and(|p| !p.is_flat())
    }

    pub fn is_flat(&self) -> bool {
        self.positions.values().all(Position::is_flat)
    }

    /// Apply a fill: adjust the position, move cash, book commission.
    ///
    /// Creates the position on the first fill for a flat symbol and removes it
    /// when its quantity returns to zero. Returns the PnL realized by the fill
    /// (before commission).
    pub fn apply_fill(&mut self, fill: &FillEvent) -> f64 {
        self.cash += fill.cash_delta();
        self.total_commission += fill.commission;

        let signed = fill.signed_quantity();
        let realized = match self.positions.get_mut(&fill.symbol) {
            Some(pos) => pos.apply_fill(signed, fill.price),
            None => {
                self.positions.insert(
                    fill.symbol.clone(),
                    Position::new(fill.symbol.clone(), signed, fill.price),
                );
                0.0
            }
        };
        self.realized_pnl += realized;

        if self.positions.get(&fill.symbol).is_some_and(Position::is_flat) {
            self.positions.remove(&fill.symbol);
        }
        realized
    }
}
