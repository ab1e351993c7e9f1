//! Performance metrics: pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity series and/or round trips in,
//! scalar out. No dependencies on the engine or the data pipeline.

use crate::domain::RoundTrip;
use serde::{Deserialize, Serialize};

/// Trading periods per year for daily bars.
pub const DEFAULT_ANNUALIZATION: f64 = 252.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a positive fraction of the peak.
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_commission: f64,
    pub final_equity: f64,
    pub equity_points: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity series and the completed round trips.
    pub fn compute(
        equity: &[f64],
        trips: &[RoundTrip],
        initial_capital: f64,
        total_commission: f64,
        annualization: f64,
    ) -> Self {
        let final_equity = equity.last().copied().unwrap_or(initial_capital);
        Self {
            total_return: total_return(initial_capital, final_equity),
            sharpe_ratio: sharpe_ratio(equity, annualization),
            max_drawdown: max_drawdown(equity),
            total_trades: trips.len(),
            win_rate: win_rate(trips),
            profit_factor: profit_factor(trips),
            total_commission,
            final_equity,
            equity_points: equity.len(),
        }
    }
}

/// Total return as a fraction: final / initial - 1.
pub fn total_return(initial_capital: f64, final_equity: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    final_equity / initial_capital - 1.0
}

/// Simple per-period returns of an equity series.
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Annualized Sharpe ratio: mean / stdev of period returns * sqrt(annualization).
///
/// Uses the sample standard deviation. Returns 0.0 for fewer than two returns
/// or zero variance.
pub fn sharpe_ratio(equity: &[f64], annualization: f64) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * annualization.sqrt()
}

/// Maximum drawdown as a positive fraction (0.15 = 15% below the running peak).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd
}

/// Fraction of round trips with positive net PnL.
pub fn win_rate(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    trips.iter().filter(|t| t.is_winner()).count() as f64 / trips.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 when there are no losses.
pub fn profit_factor(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trips.iter().map(|t| t.net_pnl).filter(|p| *p > 0.0).sum();
    let gross_loss: f64 = trips
        .iter()
        .map(|t| t.net_pnl)
        .filter(|p| *p < 0.0)
        .map(f64::abs)
        .sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
