//! Backtesting engine: event queue, run loop and supporting infrastructure.
//!
//! The engine owns the queue and the handler instances. Handlers answer each
//! event with new events; the engine routes them until the queue is empty and
//! only then releases the next timestamp.

pub mod config;
pub mod loop_runner;
pub mod queue;
pub mod state;
pub mod trade_extraction;

pub use config::{ConfigError, EngineConfig};
pub use loop_runner::{run_backtest, run_with};
pub use queue::EventQueue;
pub use state::{BacktestError, EventCounts, RunResult};
pub use trade_extraction::extract_round_trips;
