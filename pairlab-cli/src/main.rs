//! PairLab CLI: pairs-trading backtests from the command line.
//!
//! Commands:
//! - `run`: backtest one pair from a TOML config file
//! - `compare`: backtest several pairs with shared settings and rank them
//! - `download`: fetch daily bars from Yahoo Finance into `<SYMBOL>.csv` files
//!
//! Logging goes to stderr; set `RUST_LOG` to override the default `pairlab=info`.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pairlab_core::data::{CsvProvider, DataProvider, YahooProvider};
use pairlab_runner::export::generate_report;
use pairlab_runner::{
    run_batch, run_single_backtest, save_artifacts, BacktestConfig, BacktestResult, Comparison,
};

#[derive(Parser)]
#[command(name = "pairlab", about = "PairLab: event-driven pairs-trading backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where bars come from.
#[derive(Args, Clone)]
struct SourceArgs {
    /// Directory of <SYMBOL>.csv files.
    #[arg(long, conflicts_with = "yahoo")]
    data_dir: Option<PathBuf>,

    /// Fetch bars from Yahoo Finance.
    #[arg(long, default_value_t = false)]
    yahoo: bool,

    /// Fall back to a synthetic cointegrated pair when data is unavailable.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one pair from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        /// Output directory; artifacts go to <output-dir>/<run-id>/.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Also write a Markdown report next to the artifacts.
        #[arg(long, default_value_t = false)]
        report: bool,
    },
    /// Backtest several pairs with shared settings and print a summary table.
    Compare {
        /// Pairs as LEG_A/LEG_B (e.g. KO/PEP XOM/CVX).
        #[arg(required = true)]
        pairs: Vec<String>,

        /// TOML config supplying dates, capital, and strategy knobs. Its symbols are ignored.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Start date (YYYY-MM-DD). Overrides the config.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Overrides the config.
        #[arg(long)]
        end: Option<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Print the comparison as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fetch daily bars from Yahoo Finance and write <SYMBOL>.csv files.
    Download {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Target directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pairlab=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            source,
            output_dir,
            report,
        } => run_cmd(&config, &source, &output_dir, report),
        Commands::Compare {
            pairs,
            config,
            start,
            end,
            source,
            json,
        } => compare_cmd(&pairs, config.as_deref(), start, end, &source, json),
        Commands::Download {
            symbols,
            start,
            end,
            data_dir,
        } => download_cmd(&symbols, start, end, &data_dir),
    }
}

fn build_provider(source: &SourceArgs) -> Result<Option<Box<dyn DataProvider>>> {
    if let Some(dir) = &source.data_dir {
        return Ok(Some(Box::new(CsvProvider::new(dir))));
    }
    if source.yahoo {
        return Ok(Some(Box::new(YahooProvider::new()?)));
    }
    if !source.synthetic {
        bail!("no data source: pass --data-dir, --yahoo, or --synthetic");
    }
    Ok(None)
}

fn parse_date(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("dates must be YYYY-MM-DD")
}

fn run_cmd(config_path: &Path, source: &SourceArgs, output_dir: &Path, report: bool) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let provider = build_provider(source)?;

    let result = run_single_backtest(&config, provider.as_deref(), source.synthetic)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    if report {
        std::fs::write(run_dir.join("report.md"), generate_report(&result))?;
    }
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn compare_cmd(
    pairs: &[String],
    config_path: Option<&Path>,
    start: Option<String>,
    end: Option<String>,
    source: &SourceArgs,
    json: bool,
) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;

    let mut base = match (config_path, start, end) {
        (Some(path), _, _) => BacktestConfig::from_file(path)?,
        (None, Some(start), Some(end)) => BacktestConfig::new("A", "B", start, end),
        (None, _, _) => bail!("compare needs --config or both --start and --end"),
    };
    if let Some(start) = start {
        base.backtest.start_date = start;
    }
    if let Some(end) = end {
        base.backtest.end_date = end;
    }

    let configs = pairs
        .iter()
        .map(|p| match p.split_once('/') {
            Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok(base.with_pair(a, b)),
            _ => bail!("invalid pair '{p}', expected LEG_A/LEG_B"),
        })
        .collect::<Result<Vec<_>>>()?;
    for config in &configs {
        config.validate()?;
    }

    let provider = build_provider(source)?;
    let mut results: Vec<BacktestResult> = Vec::with_capacity(configs.len());
    for (pair, outcome) in pairs
        .iter()
        .zip(run_batch(&configs, provider.as_deref(), source.synthetic))
    {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => warn!(pair = %pair, error = %e, "pair skipped"),
        }
    }
    if results.is_empty() {
        bail!("no pair produced a result");
    }

    let comparison = Comparison::new(&results);
    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
    } else {
        println!();
        print!("{}", comparison.render());
    }
    Ok(())
}

fn download_cmd(
    symbols: &[String],
    start: Option<String>,
    end: Option<String>,
    data_dir: &Path,
) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let start = parse_date(start)?.unwrap_or(today - chrono::Duration::days(365 * 10));
    let end = parse_date(end)?.unwrap_or(today);

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let provider = YahooProvider::new()?;
    let csv_layout = CsvProvider::new(data_dir);

    let mut failed = 0usize;
    for symbol in symbols {
        match provider.fetch(symbol, start, end) {
            Ok(fetched) => {
                let path = csv_layout.path_for(symbol);
                let mut wtr = csv::Writer::from_path(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                for bar in &fetched.bars {
                    wtr.serialize(bar)?;
                }
                wtr.flush()?;
                info!(symbol = %symbol, bars = fetched.bars.len(), path = %path.display(), "saved");
            }
            Err(e) => {
                eprintln!("Error for {symbol}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} symbol(s) failed", symbols.len());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Pair Backtest ===");
    println!("Pair:           {}", result.label());
    println!("Period:         {} to {}", result.start_date, result.end_date);
    println!(
        "Bars:           {} ({} with gaps)",
        result.bar_count, result.gap_count
    );
    println!(
        "Events:         {} market, {} signal, {} order, {} fill",
        result.counts.market, result.counts.signal, result.counts.order, result.counts.fill
    );
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Round Trips:    {}", m.total_trades);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Commission:     {:.2}", m.total_commission);
    println!("Final Equity:   {:.2}", m.final_equity);
    if !result.rejections.is_empty() {
        println!("Rejected:       {} signal(s)", result.rejections.len());
    }
    if result.unfilled_orders > 0 {
        println!("Unfilled:       {} order(s) at end of data", result.unfilled_orders);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
