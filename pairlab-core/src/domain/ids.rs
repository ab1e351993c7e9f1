use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Signal ID, unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId(pub u64);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Monotonic ID generator. IDs start at 1 and never repeat within a run,
/// so two runs over identical inputs assign identical IDs.
#[derive(Debug, Default, Clone)]
pub struct IdGen {
    next_order: u64,
    next_signal: u64,
}

impl IdGen {
    pub fn next_order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId(self.next_order)
    }

    pub fn next_signal_id(&mut self) -> SignalId {
        self.next_signal += 1;
        SignalId(self.next_signal)
    }
}
