//! PairLab Core: events, pairs strategy, portfolio, execution, event loop.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, events, positions, portfolio state, round trips)
//! - Data providers, pair alignment and bar replay
//! - Rolling pair statistics and the Dickey-Fuller stationarity check
//! - Pairs-trading strategy emitting LONG / SHORT / EXIT signals
//! - Portfolio sizing, fills, equity tracking
//! - Simulated execution with configurable fill price and commission
//! - FIFO event loop and performance metrics

pub mod data;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod metrics;
pub mod portfolio;
pub mod stats;
pub mod strategy;
