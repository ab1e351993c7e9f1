use serde::{Deserialize, Serialize};

/// Quantities below this magnitude are treated as flat.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Net position in one symbol.
///
/// `quantity` is signed: positive = long, negative = short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
    /// PnL realized by fills that reduced this position (before commission).
    pub realized_pnl: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_entry_price: price,
            realized_pnl: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > QUANTITY_EPSILON
    }

    pub fn is_short(&self) -> bool {
        self.quantity < -QUANTITY_EPSILON
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.abs() <= QUANTITY_EPSILON
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.avg_entry_price)
    }

    /// Apply a signed fill quantity at `price`. Returns the PnL realized by it.
    ///
    /// Adding in the same direction averages the entry price. Reducing realizes
    /// PnL on the closed part. Crossing zero closes the old position and opens
    /// the remainder at `price`.
    pub fn apply_fill(&mut self, signed_qty: f64, price: f64) -> f64 {
        if self.is_flat() || self.quantity.signum() == signed_qty.signum() {
            let old = self.quantity.abs();
            let add = signed_qty.abs();
            self.avg_entry_price = if self.is_flat() {
                price
            } else {
                (self.avg_entry_price * old + price * add) / (old + add)
            };
            self.quantity += signed_qty;
            return 0.0;
        }

        let closed = signed_qty.abs().min(self.quantity.abs());
        let realized = closed * (price - self.avg_entry_price) * self.quantity.signum();
        self.realized_pnl += realized;

        let before = self.quantity;
        self.quantity += signed_qty;
        if self.is_flat() {
            self.quantity = 0.0;
        } else if before.signum() != self.quantity.signum() {
            self.avg_entry_price = price;
        }
        realized
    }
}
