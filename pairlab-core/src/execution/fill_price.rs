//! Fill price policy: which bar and which price an order fills at.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Park the order; fill at the open of the next bar with data for its symbol.
    #[default]
    NextBarOpen,
    /// Fill immediately at the close of the bar that produced the signal.
    /// Trades at a price the signal already saw.
    SignalBarClose,
}

impl FillPolicy {
    /// True when orders wait for a later bar.
    pub fn is_deferred(self) -> bool {
        matches!(self, FillPolicy::NextBarOpen)
    }

    /// Price this policy fills at on `bar`; `None` when that price is unusable.
    pub fn reference_price(self, bar: &Bar) -> Option<f64> {
        let price = match self {
            FillPolicy::NextBarOpen => bar.open,
            FillPolicy::SignalBarClose => bar.close,
        };
        (price.is_finite() && price > 0.0).then_some(price)
    }
}
