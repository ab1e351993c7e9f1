//! Domain types for PairLab

pub mod bar;
pub mod event;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use event::{
    Event, EventKind, FillEvent, MarketEvent, OrderEvent, PairId, SignalEvent, SignalType,
};
pub use ids::{IdGen, OrderId, SignalId};
pub use order::{OrderSide, OrderType};
pub use portfolio::PortfolioState;
pub use position::{Position, QUANTITY_EPSILON};
pub use trade::RoundTrip;

/// Symbol type alias
pub type Symbol = String;
