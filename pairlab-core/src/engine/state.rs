//! Run result and engine error types.

use super::config::ConfigError;
use crate::domain::{Event, EventKind, FillEvent, OrderEvent, PortfolioState, RoundTrip};
use crate::metrics::PerformanceMetrics;
use crate::portfolio::{EquityRow, Rejection};
use crate::strategy::StrategyDiagnostics;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal conditions that stop a run before any metrics are produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data integrity violated: {reason}")]
    DataIntegrity { reason: String },
}

impl BacktestError {
    pub fn integrity(reason: impl Into<String>) -> Self {
        BacktestError::DataIntegrity {
            reason: reason.into(),
        }
    }
}

/// Events processed per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub market: usize,
    pub signal: usize,
    pub order: usize,
    pub fill: usize,
}

impl EventCounts {
    pub fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Market => self.market += 1,
            EventKind::Signal => self.signal += 1,
            EventKind::Order => self.order += 1,
            EventKind::Fill => self.fill += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.market + self.signal + self.order + self.fill
    }
}

/// Result of a complete backtest run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Symbols replayed, in data order.
    pub symbols: Vec<String>,
    /// One row per timestamp, in time order.
    pub equity: Vec<EquityRow>,
    /// All fills in processing order.
    pub fills: Vec<FillEvent>,
    /// Completed flat-to-flat round trips.
    pub round_trips: Vec<RoundTrip>,
    pub metrics: PerformanceMetrics,
    /// Signals the portfolio refused.
    pub rejections: Vec<Rejection>,
    /// Every event in the order it was processed.
    pub events: Vec<Event>,
    pub counts: EventCounts,
    /// Orders still parked when the data ran out.
    pub unfilled_orders: Vec<OrderEvent>,
    pub diagnostics: StrategyDiagnostics,
    /// Book at the end of the run.
    pub final_state: PortfolioState,
    /// Timestamps processed.
    pub bar_count: usize,
    /// Timestamps on which at least one symbol had no bar.
    pub gap_count: usize,
}

impl RunResult {
    pub fn final_equity(&self) -> f64 {
        self.metrics.final_equity
    }

    /// Equity totals in time order.
    pub fn equity_totals(&self) -> Vec<f64> {
        self.equity.iter().map(|row| row.point.total).collect()
    }

    /// Events of one kind, in processing order.
    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind() == kind)
    }
}
