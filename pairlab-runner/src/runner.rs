//! Backtest runner: wires config, data loading, and the engine together.
//!
//! Entry points:
//! - `run_single_backtest()`: loads data for the configured pair, then runs.
//! - `run_backtest_from_data()`: runs on pre-loaded data, no I/O.
//! - `run_batch()`: independent pair runs in parallel with rayon. Each run
//!   stays single-threaded.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use pairlab_core::data::{DataProvider, DataSource};
use pairlab_core::domain::{PairId, RoundTrip};
use pairlab_core::engine::{run_backtest, BacktestError, EventCounts};
use pairlab_core::metrics::PerformanceMetrics;
use pairlab_core::portfolio::{EquityRow, Rejection};
use pairlab_core::strategy::StrategyDiagnostics;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_pair, LoadError, LoadOptions, LoadedData};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("backtest failed: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete, serializable result of one pair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub pair: PairId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub equity: Vec<EquityRow>,
    pub round_trips: Vec<RoundTrip>,
    pub rejections: Vec<Rejection>,
    pub counts: EventCounts,
    pub diagnostics: StrategyDiagnostics,
    /// Orders still parked when the data ran out.
    pub unfilled_orders: usize,
    pub bar_count: usize,
    pub gap_count: usize,
    pub dataset_hash: String,
    pub sources: BTreeMap<String, DataSource>,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// `LEG_A/LEG_B`.
    pub fn label(&self) -> String {
        self.pair.to_string()
    }

    /// Symbols in equity-row order.
    pub fn symbols(&self) -> Vec<String> {
        self.config.backtest.symbols.clone()
    }
}

/// Load data for the configured pair and run it.
pub fn run_single_backtest(
    config: &BacktestConfig,
    provider: Option<&dyn DataProvider>,
    synthetic: bool,
) -> Result<BacktestResult, RunError> {
    let pair = config.pair()?;
    let opts = LoadOptions::new(config.backtest.start_date, config.backtest.end_date)
        .with_synthetic(synthetic);
    let loaded = load_pair(&pair, provider, &opts)?;
    run_backtest_from_data(config, &loaded)
}

/// Run on pre-loaded data.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let engine_config = config.to_engine_config()?;
    let run_id = config.run_id()?;
    let result = run_backtest(&loaded.aligned, &engine_config)?;

    info!(
        run_id = %run_id,
        pair = %engine_config.pair,
        total_return = result.metrics.total_return,
        trades = result.metrics.total_trades,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        pair: engine_config.pair,
        start_date: config.backtest.start_date,
        end_date: config.backtest.end_date,
        initial_capital: config.backtest.initial_capital,
        config: config.clone(),
        metrics: result.metrics,
        equity: result.equity,
        round_trips: result.round_trips,
        rejections: result.rejections,
        counts: result.counts,
        diagnostics: result.diagnostics,
        unfilled_orders: result.unfilled_orders.len(),
        bar_count: result.bar_count,
        gap_count: result.gap_count,
        dataset_hash: loaded.dataset_hash.clone(),
        sources: loaded.sources.clone(),
        has_synthetic: loaded.has_synthetic,
    })
}

/// Run several configs in parallel. Results keep the input order; one
/// failing pair does not stop the others.
pub fn run_batch(
    configs: &[BacktestConfig],
    provider: Option<&dyn DataProvider>,
    synthetic: bool,
) -> Vec<Result<BacktestResult, RunError>> {
    configs
        .par_iter()
        .map(|config| run_single_backtest(config, provider, synthetic))
        .collect()
}
