//! Side-by-side comparison of several pair runs.
//!
//! Rows keep the input order. The best-return and best-Sharpe callouts skip
//! non-finite values; ties go to the earlier row.

use serde::{Deserialize, Serialize};

use crate::runner::BacktestResult;

/// One line of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub pair: String,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub has_synthetic: bool,
}

impl From<&BacktestResult> for ComparisonRow {
    fn from(result: &BacktestResult) -> Self {
        let m = &result.metrics;
        Self {
            pair: result.label(),
            total_return: m.total_return,
            sharpe_ratio: m.sharpe_ratio,
            max_drawdown: m.max_drawdown,
            total_trades: m.total_trades,
            win_rate: m.win_rate,
            has_synthetic: result.has_synthetic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
    /// Index into `rows`.
    pub best_return: Option<usize>,
    pub best_sharpe: Option<usize>,
}

impl Comparison {
    pub fn new(results: &[BacktestResult]) -> Self {
        let rows: Vec<ComparisonRow> = results.iter().map(ComparisonRow::from).collect();
        let best_return = best_by(&rows, |r| r.total_return);
        let best_sharpe = best_by(&rows, |r| r.sharpe_ratio);
        Self {
            rows,
            best_return,
            best_sharpe,
        }
    }

    pub fn best_return_row(&self) -> Option<&ComparisonRow> {
        self.best_return.and_then(|i| self.rows.get(i))
    }

    pub fn best_sharpe_row(&self) -> Option<&ComparisonRow> {
        self.best_sharpe.and_then(|i| self.rows.get(i))
    }

    /// Fixed-width text table with the two callouts underneath.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(128 * (self.rows.len() + 4));
        out.push_str(&format!(
            "{:<14} {:>10} {:>8} {:>9} {:>7} {:>8}\n",
            "Pair", "Return", "Sharpe", "MaxDD", "Trades", "WinRate"
        ));
        out.push_str(&"-".repeat(61));
        out.push('\n');
        for row in &self.rows {
            let tag = if row.has_synthetic { " *" } else { "" };
            out.push_str(&format!(
                "{:<14} {:>9.2}% {:>8.3} {:>8.2}% {:>7} {:>7.1}%{}\n",
                row.pair,
                row.total_return * 100.0,
                row.sharpe_ratio,
                row.max_drawdown * 100.0,
                row.total_trades,
                row.win_rate * 100.0,
                tag
            ));
        }
        out.push('\n');
        if let Some(row) = self.best_return_row() {
            out.push_str(&format!(
                "Best return: {} ({:.2}%)\n",
                row.pair,
                row.total_return * 100.0
            ));
        }
        if let Some(row) = self.best_sharpe_row() {
            out.push_str(&format!(
                "Best Sharpe: {} ({:.3})\n",
                row.pair, row.sharpe_ratio
            ));
        }
        if self.rows.iter().any(|r| r.has_synthetic) {
            out.push_str("* synthetic data\n");
        }
        out
    }
}

fn best_by(rows: &[ComparisonRow], key: impl Fn(&ComparisonRow) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, row) in rows.iter().enumerate() {
        let value = key(row);
        if !value.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if value <= b => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}
