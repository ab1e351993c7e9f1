//! Portfolio: turns signals into orders and fills into positions, cash and equity.
//!
//! The portfolio is the only owner of `PortfolioState`. It sees three event
//! kinds: market events (marks), signals (orders out) and fills (book updates).
//! A signal yields either one order per leg or none at all; rejected signals
//! leave the state untouched and are kept for reporting.

pub mod equity;
pub mod sizing;

pub use equity::{EquityPoint, EquityRow, EquityTracker};
pub use sizing::{size_pair, PairSizing};

use crate::domain::{
    FillEvent, IdGen, MarketEvent, OrderEvent, OrderId, OrderSide, OrderType, PortfolioState,
    SignalEvent, SignalId, SignalType,
};
use crate::execution::CommissionModel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a signal produced no orders.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("insufficient capital: need {required:.2}, have {available:.2}")]
    InsufficientCapital { required: f64, available: f64 },

    #[error("a position in the pair is already open")]
    DuplicatePosition,

    #[error("{count} order(s) still awaiting fills")]
    OrdersInFlight { count: usize },

    #[error("no open position to exit")]
    NoOpenPosition,

    #[error("sized quantity rounds to zero")]
    ZeroQuantity,

    #[error("no usable price for {symbol}")]
    MissingPrice { symbol: String },
}

/// A rejected signal, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub timestamp: NaiveDate,
    pub signal_id: SignalId,
    pub signal_type: SignalType,
    pub reason: RejectReason,
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    state: PortfolioState,
    /// Fraction of equity committed as gross notional per entry.
    allocation: f64,
    commission: CommissionModel,
    marks: BTreeMap<String, f64>,
    equity: EquityTracker,
    ids: IdGen,
    in_flight: BTreeMap<OrderId, OrderEvent>,
    rejections: Vec<Rejection>,
}

impl Portfolio {
    pub fn new(initial_capital: f64, allocation: f64, commission: CommissionModel) -> Self {
        Self {
            state: PortfolioState::new(initial_capital),
            allocation,
            commission,
            marks: BTreeMap::new(),
            equity: EquityTracker::new(initial_capital),
            ids: IdGen::default(),
            in_flight: BTreeMap::new(),
            rejections: Vec::new(),
        }
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    /// Last valid close per symbol.
    pub fn marks(&self) -> &BTreeMap<String, f64> {
        &self.marks
    }

    pub fn equity_tracker(&self) -> &EquityTracker {
        &self.equity
    }

    pub fn current_equity(&self) -> f64 {
        self.state.equity(&self.marks)
    }

    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &OrderEvent> {
        self.in_flight.values()
    }

    /// Update marks from valid closes (gaps keep the previous mark) and open
    /// the equity point for this timestamp.
    pub fn on_market(&mut self, market: &MarketEvent) {
        for (symbol, bar) in &market.bars {
            if let Some(close) = bar.as_ref().and_then(|b| b.valid_close()) {
                self.marks.insert(symbol.clone(), close);
            }
        }
        self.equity.record(market.timestamp, &self.state, &self.marks);
    }

    /// Translate a signal into zero or two orders (one per leg).
    pub fn on_signal(&mut self, signal: &SignalEvent) -> Vec<OrderEvent> {
        let planned = match signal.signal_type {
            SignalType::Exit => self.plan_exit(signal),
            SignalType::Long | SignalType::Short => self.plan_entry(signal),
        };
        let legs = match planned {
            Ok(legs) => legs,
            Err(reason) => {
                warn!(
                    date = %signal.timestamp,
                    signal = %signal.id,
                    kind = %signal.signal_type,
                    %reason,
                    "signal rejected"
                );
                self.rejections.push(Rejection {
                    timestamp: signal.timestamp,
                    signal_id: signal.id,
                    signal_type: signal.signal_type,
                    reason,
                });
                return Vec::new();
            }
        };

        legs.into_iter()
            .map(|(symbol, side, quantity)| {
                let order = OrderEvent {
                    id: self.ids.next_order_id(),
                    signal_id: signal.id,
                    timestamp: signal.timestamp,
                    symbol,
                    side,
                    quantity,
                    order_type: OrderType::Market,
                };
                debug!(order = %order.id, symbol = %order.symbol, side = %order.side, qty = order.quantity, "order");
                self.in_flight.insert(order.id, order.clone());
                order
            })
            .collect()
    }

    /// Apply a fill to the book and refresh the equity point for its timestamp.
    /// Returns the PnL realized by the fill.
    pub fn on_fill(&mut self, fill: &FillEvent) -> f64 {
        self.in_flight.remove(&fill.order_id);
        let realized = self.state.apply_fill(fill);
        self.equity.record(fill.timestamp, &self.state, &self.marks);
        debug!(
            order = %fill.order_id,
            symbol = %fill.symbol,
            price = fill.price,
            cash = self.state.cash,
            "fill applied"
        );
        realized
    }

    fn plan_entry(&self, signal: &SignalEvent) -> Result<Vec<(String, OrderSide, f64)>, RejectReason> {
        if !self.in_flight.is_empty() {
            return Err(RejectReason::OrdersInFlight {
                count: self.in_flight.len(),
            });
        }
        let [leg_a, leg_b] = signal.pair.symbols();
        if self.state.has_position(leg_a) || self.state.has_position(leg_b) {
            return Err(RejectReason::DuplicatePosition);
        }
        let price_a = self.mark(leg_a)?;
        let price_b = self.mark(leg_b)?;

        let sizing = size_pair(
            signal.signal_type,
            signal.hedge_ratio,
            price_a,
            price_b,
            self.current_equity(),
            self.allocation,
        )
        .ok_or(RejectReason::ZeroQuantity)?;
        if sizing.qty_a <= 0.0 || sizing.qty_b <= 0.0 {
            return Err(RejectReason::ZeroQuantity);
        }

        let required = sizing.gross_notional
            + self.commission.commission(price_a, sizing.qty_a)
            + self.commission.commission(price_b, sizing.qty_b);
        if required > self.state.cash {
            return Err(RejectReason::InsufficientCapital {
                required,
                available: self.state.cash,
            });
        }

        Ok(vec![
            (leg_a.to_string(), sizing.side_a, sizing.qty_a),
            (leg_b.to_string(), sizing.side_b, sizing.qty_b),
        ])
    }

    fn plan_exit(&self, signal: &SignalEvent) -> Result<Vec<(String, OrderSide, f64)>, RejectReason> {
        if !self.in_flight.is_empty() {
            return Err(RejectReason::OrdersInFlight {
                count: self.in_flight.len(),
            });
        }
        let legs: Vec<_> = signal
            .pair
            .symbols()
            .into_iter()
            .filter(|sym| self.state.has_position(sym))
            .map(|sym| {
                let qty = self.state.quantity(sym);
                (sym.to_string(), OrderSide::closing(qty), qty.abs())
            })
            .collect();
        if legs.is_empty() {
            return Err(RejectReason::NoOpenPosition);
        }
        Ok(legs)
    }

    fn mark(&self, symbol: &str) -> Result<f64, RejectReason> {
        self.marks
            .get(symbol)
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| RejectReason::MissingPrice {
                symbol: symbol.to_string(),
            })
    }
}
