//! Execution: turns orders into fills.
//!
//! The handler never touches portfolio state. It answers an order with a fill
//! (immediate policies) or parks it until the next usable bar (deferred
//! policies), attaching commission to every fill it prints.

pub mod cost_model;
pub mod fill_price;

pub use cost_model::CommissionModel;
pub use fill_price::FillPolicy;

use crate::domain::{Bar, FillEvent, MarketEvent, OrderEvent};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Simulated broker.
pub trait ExecutionHandler: Send + Sync {
    /// Fill any parked orders that can execute on this bar.
    fn on_market(&mut self, market: &MarketEvent) -> Vec<FillEvent>;

    /// Accept an order. Returns the fill when it executes immediately.
    fn on_order(&mut self, order: &OrderEvent) -> Option<FillEvent>;

    /// Orders accepted but not yet filled, oldest first.
    fn pending_orders(&self) -> &[OrderEvent];
}

#[derive(Debug, Clone)]
pub struct SimulatedExecutionHandler {
    policy: FillPolicy,
    commission: CommissionModel,
    pending: Vec<OrderEvent>,
    latest_bars: BTreeMap<String, Bar>,
}

impl SimulatedExecutionHandler {
    pub fn new(policy: FillPolicy, commission: CommissionModel) -> Self {
        Self {
            policy,
            commission,
            pending: Vec::new(),
            latest_bars: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> FillPolicy {
        self.policy
    }

    fn fill(&self, order: &OrderEvent, bar: &Bar, price: f64) -> FillEvent {
        FillEvent {
            order_id: order.id,
            timestamp: bar.date,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            commission: self.commission.commission(price, order.quantity),
        }
    }
}

impl ExecutionHandler for SimulatedExecutionHandler {
    fn on_market(&mut self, market: &MarketEvent) -> Vec<FillEvent> {
        for (symbol, bar) in &market.bars {
            if let Some(bar) = bar {
                self.latest_bars.insert(symbol.clone(), bar.clone());
            }
        }
        if self.pending.is_empty() {
            return Vec::new();
        }

        let mut fills = Vec::new();
        let mut still_pending = Vec::new();
        for order in std::mem::take(&mut self.pending) {
            let price = market
                .bar(&order.symbol)
                .filter(|_| market.timestamp > order.timestamp)
                .and_then(|bar| self.policy.reference_price(bar).map(|p| (bar, p)));
            match price {
                Some((bar, price)) => {
                    let fill = self.fill(&order, bar, price);
                    debug!(order = %order.id, symbol = %fill.symbol, price, date = %fill.timestamp, "parked order filled");
                    fills.push(fill);
                }
                None => {
                    trace!(order = %order.id, date = %market.timestamp, "order stays parked");
                    still_pending.push(order);
                }
            }
        }
        self.pending = still_pending;
        fills
    }

    fn on_order(&mut self, order: &OrderEvent) -> Option<FillEvent> {
        if !self.policy.is_deferred() {
            let immediate = self
                .latest_bars
                .get(&order.symbol)
                .filter(|bar| bar.date == order.timestamp)
                .and_then(|bar| self.policy.reference_price(bar).map(|p| (bar, p)));
            if let Some((bar, price)) = immediate {
                return Some(self.fill(order, bar, price));
            }
        }
        self.pending.push(order.clone());
        None
    }

    fn pending_orders(&self) -> &[OrderEvent] {
        &self.pending
    }
}
