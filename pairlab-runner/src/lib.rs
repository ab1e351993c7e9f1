//! PairLab Runner: backtest orchestration on top of `pairlab-core`.
//!
//! This crate provides:
//! - TOML configuration with content-addressed run ids
//! - Data loading from CSV or Yahoo with a synthetic cointegrated fallback
//! - Single runs and parallel batch runs over several pairs
//! - Comparison tables across pairs
//! - Artifact export (manifest.json, equity.csv, trades.csv) and Markdown reports

pub mod compare;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use compare::{Comparison, ComparisonRow};
pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{load_pair, LoadError, LoadOptions, LoadedData};
pub use export::{generate_report, load_artifacts, save_artifacts};
pub use runner::{
    run_backtest_from_data, run_batch, run_single_backtest, BacktestResult, RunError,
    SCHEMA_VERSION,
};
