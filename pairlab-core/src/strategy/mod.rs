//! Strategies: consume market events, emit directional intent.
//!
//! Strategies are portfolio-agnostic: they see market data only, never cash or
//! positions. A strategy's state reflects the signals it has emitted, not the
//! orders the portfolio chose to place.

pub mod pairs;

pub use pairs::{PairsConfig, PairsTradingStrategy, SpreadState};

use crate::domain::{MarketEvent, SignalEvent};
use serde::{Deserialize, Serialize};

/// Why a strategy produced no signal for a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A leg had no usable bar; the timestamp was skipped entirely.
    DataGap,
    /// The rolling window is not full yet.
    InsufficientData,
    /// The window has no usable variance.
    NumericDegenerate,
    /// An entry was suppressed by the stationarity test.
    NotCointegrated,
}

/// Per-run counters of what the strategy saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyDiagnostics {
    pub evaluated: usize,
    pub data_gaps: usize,
    pub insufficient_data: usize,
    pub numeric_degenerate: usize,
    pub not_cointegrated: usize,
    pub signals: usize,
}

impl StrategyDiagnostics {
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::DataGap => self.data_gaps += 1,
            SkipReason::InsufficientData => self.insufficient_data += 1,
            SkipReason::NumericDegenerate => self.numeric_degenerate += 1,
            SkipReason::NotCointegrated => self.not_cointegrated += 1,
        }
    }
}

/// Signal generator driven by market events.
///
/// `evaluate` is called exactly once per timestamp, after execution and the
/// portfolio have seen the same market event.
pub trait Strategy: Send + Sync {
    /// Human-readable name (e.g., "pairs_trading").
    fn name(&self) -> &str;

    /// Symbols this strategy needs in every market event.
    fn symbols(&self) -> Vec<String>;

    fn evaluate(&mut self, market: &MarketEvent) -> Option<SignalEvent>;

    fn diagnostics(&self) -> StrategyDiagnostics {
        StrategyDiagnostics::default()
    }
}

/// A strategy that never emits. Useful for buy-nothing baselines and tests.
#[derive(Debug, Clone, Default)]
pub struct NullStrategy {
    symbols: Vec<String>,
}

impl NullStrategy {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }
}

impl Strategy for NullStrategy {
    fn name(&self) -> &str {
        "null"
    }

    fn symbols(&self) -> Vec<String> {
        self.symbols.clone()
    }

    fn evaluate(&mut self, _market: &MarketEvent) -> Option<SignalEvent> {
        None
    }
}
