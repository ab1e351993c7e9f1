//! Event taxonomy: the immutable records that flow through the engine queue.
//!
//! Handlers receive events by shared reference and answer with new events.
//! Nothing downstream of a producer ever mutates an event it was handed.

use super::bar::Bar;
use super::ids::{OrderId, SignalId};
use super::order::{OrderSide, OrderType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tagged union of every event the engine routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

/// Discriminant of an [`Event`], used for routing and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }

    pub fn timestamp(&self) -> NaiveDate {
        match self {
            Event::Market(e) => e.timestamp,
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}

// ── Market ───────────────────────────────────────────────────────────

/// New market data for one timestamp.
///
/// Every symbol of the universe has an entry. `None` marks an explicit data gap:
/// the symbol had no usable bar at this timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp: NaiveDate,
    pub bars: BTreeMap<String, Option<Bar>>,
}

impl MarketEvent {
    pub fn bar(&self, symbol: &str) -> Option<&Bar> {
        self.bars.get(symbol).and_then(|b| b.as_ref())
    }

    pub fn close(&self, symbol: &str) -> Option<f64> {
        self.bar(symbol).map(|b| b.close)
    }

    /// Symbols with no bar at this timestamp.
    pub fn gaps(&self) -> impl Iterator<Item = &str> {
        self.bars
            .iter()
            .filter(|(_, bar)| bar.is_none())
            .map(|(sym, _)| sym.as_str())
    }

    /// True when every symbol has a bar.
    pub fn is_complete(&self) -> bool {
        self.bars.values().all(|b| b.is_some())
    }
}

// ── Signal ───────────────────────────────────────────────────────────

/// Identifies a traded pair: the spread is `leg_a - beta * leg_b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairId {
    pub leg_a: String,
    pub leg_b: String,
}

impl PairId {
    pub fn new(leg_a: impl Into<String>, leg_b: impl Into<String>) -> Self {
        Self {
            leg_a: leg_a.into(),
            leg_b: leg_b.into(),
        }
    }

    pub fn symbols(&self) -> [&str; 2] {
        [&self.leg_a, &self.leg_b]
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.leg_a, self.leg_b)
    }
}

/// What the strategy wants done with the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    /// Buy the spread: long A, short beta * B.
    Long,
    /// Sell the spread: short A, long beta * B.
    Short,
    /// Flatten both legs.
    Exit,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Long => write!(f, "LONG"),
            SignalType::Short => write!(f, "SHORT"),
            SignalType::Exit => write!(f, "EXIT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub id: SignalId,
    pub timestamp: NaiveDate,
    pub pair: PairId,
    pub signal_type: SignalType,
    /// |z| at emission.
    pub strength: f64,
    pub z_score: f64,
    /// Hedge ratio used to size leg B.
    pub hedge_ratio: f64,
}

// ── Order ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub id: OrderId,
    /// Signal this order was derived from.
    pub signal_id: SignalId,
    pub timestamp: NaiveDate,
    pub symbol: String,
    pub side: OrderSide,
    /// Always positive; direction lives in `side`.
    pub quantity: f64,
    pub order_type: OrderType,
}

impl OrderEvent {
    /// Quantity with the sign of the side.
    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }
}

// ── Fill ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: OrderId,
    pub timestamp: NaiveDate,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
}

impl FillEvent {
    /// Gross value of the fill: price * quantity.
    pub fn gross_amount(&self) -> f64 {
        self.price * self.quantity
    }

    pub fn signed_quantity(&self) -> f64 {
        self.side.sign() * self.quantity
    }

    /// Change in cash caused by this fill, commission included.
    ///
    /// Buy: `-(price * qty + commission)`. Sell: `price * qty - commission`.
    pub fn cash_delta(&self) -> f64 {
        -self.side.sign() * self.gross_amount() - self.commission
    }
}
