//! Reporting and export: JSON manifest, CSV tapes, and a Markdown report.
//!
//! A saved run lives in `<output_dir>/<run_id>/`:
//! - `manifest.json`: the full `BacktestResult`
//! - `equity.csv`: one row per timestamp
//! - `trades.csv`: one row per round trip
//!
//! Manifests carry a `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pairlab_core::domain::RoundTrip;
use pairlab_core::portfolio::EquityRow;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: timestamp, cash, `holdings_<SYM>` and `position_<SYM>` per
/// symbol, commission, total, returns, equity_curve.
pub fn export_equity_csv(rows: &[EquityRow], symbols: &[String]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["timestamp".to_string(), "cash".to_string()];
    header.extend(symbols.iter().map(|s| format!("holdings_{s}")));
    header.extend(symbols.iter().map(|s| format!("position_{s}")));
    header.extend(["commission", "total", "returns", "equity_curve"].map(String::from));
    wtr.write_record(&header)?;

    for row in rows {
        let p = &row.point;
        let mut record = vec![p.timestamp.to_string(), format!("{:.6}", p.cash)];
        record.extend(
            symbols
                .iter()
                .map(|s| format!("{:.6}", p.holdings.get(s).copied().unwrap_or(0.0))),
        );
        record.extend(
            symbols
                .iter()
                .map(|s| format!("{}", p.positions.get(s).copied().unwrap_or(0.0))),
        );
        record.push(format!("{:.6}", p.commission));
        record.push(format!("{:.6}", p.total));
        record.push(format!("{:.10}", row.period_return));
        record.push(format!("{:.10}", row.equity_curve));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per round trip.
pub fn export_trades_csv(trips: &[RoundTrip]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_date",
        "exit_date",
        "symbols",
        "fills",
        "days_held",
        "gross_pnl",
        "commission",
        "net_pnl",
        "max_notional",
        "return_pct",
    ])?;

    for t in trips {
        wtr.write_record([
            &t.entry_date.to_string(),
            &t.exit_date.to_string(),
            &t.symbols.join("/"),
            &t.fill_count.to_string(),
            &t.days_held().to_string(),
            &format!("{:.2}", t.gross_pnl),
            &format!("{:.2}", t.commission),
            &format!("{:.2}", t.net_pnl),
            &format!("{:.2}", t.max_notional),
            &format!("{:.6}", t.return_pct()),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifact set under `output_dir/<run_id>/` and return that path.
/// An existing directory for the same run id is overwritten.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&result.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.equity, &result.symbols())?,
    )?;
    std::fs::write(
        run_dir.join("trades.csv"),
        export_trades_csv(&result.round_trips)?,
    )?;

    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let m = &result.metrics;

    md.push_str("# Pair Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Pair | {} |\n", result.label()));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!(
        "| Initial Capital | ${:.0} |\n",
        result.initial_capital
    ));
    md.push_str(&format!(
        "| Bars | {} ({} with gaps) |\n",
        result.bar_count, result.gap_count
    ));
    md.push_str(&format!("| Run Id | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let s = &result.config.strategy;
    md.push_str("## Strategy\n\n");
    md.push_str(&format!(
        "- lookback {}, z_entry {}, z_exit {}\n",
        s.lookback, s.z_entry, s.z_exit
    ));
    if let Some(p) = s.adf_p_threshold {
        md.push_str(&format!("- Dickey-Fuller gate p < {p}\n"));
    }
    md.push_str(&format!(
        "- allocation {}, fill policy {:?}, commission {:?}\n\n",
        result.config.portfolio.allocation,
        result.config.execution.fill_policy,
        result.config.execution.commission
    ));

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | ---: |\n");
    md.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        m.total_return * 100.0
    ));
    md.push_str(&format!("| Sharpe Ratio | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        m.max_drawdown * 100.0
    ));
    md.push_str(&format!("| Round Trips | {} |\n", m.total_trades));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Commission | {:.2} |\n", m.total_commission));
    md.push_str(&format!("| Final Equity | {:.2} |\n\n", m.final_equity));

    md.push_str("## Events\n\n");
    md.push_str(&format!(
        "market {}, signal {}, order {}, fill {}; {} rejected signal(s), {} unfilled order(s)\n",
        result.counts.market,
        result.counts.signal,
        result.counts.order,
        result.counts.fill,
        result.rejections.len(),
        result.unfilled_orders
    ));

    if !result.rejections.is_empty() {
        md.push_str("\n| Date | Signal | Reason |\n");
        md.push_str("| --- | --- | --- |\n");
        for r in &result.rejections {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                r.timestamp, r.signal_type, r.reason
            ));
        }
    }

    md
}
