//! Event loop: the heart of the backtesting engine.
//!
//! One iteration per timestamp:
//! 1. The data handler releases the next MARKET event onto the queue.
//! 2. The queue is drained in FIFO order. MARKET goes to execution (parked
//!    fills), then the portfolio (marks), then the strategy (signal). SIGNAL
//!    goes to the portfolio, ORDER to execution, FILL back to the portfolio.
//! 3. Only an empty queue lets the loop advance to the next timestamp.

use super::config::EngineConfig;
use super::queue::EventQueue;
use super::state::{BacktestError, EventCounts, RunResult};
use super::trade_extraction::extract_round_trips;
use crate::data::align::AlignedData;
use crate::data::handler::{DataHandler, HistoricBarHandler};
use crate::domain::Event;
use crate::execution::{ExecutionHandler, SimulatedExecutionHandler};
use crate::metrics::PerformanceMetrics;
use crate::portfolio::Portfolio;
use crate::strategy::{PairsTradingStrategy, Strategy};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Run a pairs backtest on aligned data.
///
/// Validates the configuration and the data, builds the pairs strategy, the
/// simulated broker and the portfolio from `config`, then replays every
/// timestamp of `aligned`.
pub fn run_backtest(aligned: &AlignedData, config: &EngineConfig) -> Result<RunResult, BacktestError> {
    config.validate()?;
    check_integrity(aligned, config)?;

    let mut data = HistoricBarHandler::new(aligned.clone());
    let mut strategy = PairsTradingStrategy::new(config.pair.clone(), config.strategy.clone())?;
    let mut execution = SimulatedExecutionHandler::new(config.fill_policy, config.commission);
    let portfolio = Portfolio::new(config.initial_capital, config.allocation, config.commission);

    info!(
        pair = %config.pair,
        bars = aligned.len(),
        gaps = aligned.gap_count(),
        lookback = config.strategy.lookback,
        fill_policy = ?config.fill_policy,
        "backtest starting"
    );
    run_with(
        &mut data,
        &mut strategy,
        &mut execution,
        portfolio,
        config.annualization,
    )
}

/// Drive the event loop over arbitrary components.
///
/// The data handler must serve exactly the symbols the strategy asks for, with
/// strictly increasing timestamps.
pub fn run_with(
    data: &mut dyn DataHandler,
    strategy: &mut dyn Strategy,
    execution: &mut dyn ExecutionHandler,
    mut portfolio: Portfolio,
    annualization: f64,
) -> Result<RunResult, BacktestError> {
    let symbols = data.symbols().to_vec();
    let served: BTreeSet<&str> = symbols.iter().map(String::as_str).collect();
    let wanted = strategy.symbols();
    let wanted: BTreeSet<&str> = wanted.iter().map(String::as_str).collect();
    if served != wanted {
        return Err(BacktestError::integrity(format!(
            "strategy '{}' needs {wanted:?} but data provides {served:?}",
            strategy.name()
        )));
    }

    let mut queue = EventQueue::new();
    let mut events: Vec<Event> = Vec::new();
    let mut counts = EventCounts::default();
    let mut fills = Vec::new();
    let mut last_timestamp: Option<NaiveDate> = None;
    let mut bar_count = 0;
    let mut gap_count = 0;

    while data.has_more_data() {
        let Some(market) = data.update_bars() else {
            break;
        };
        if let Some(prev) = last_timestamp {
            if market.timestamp <= prev {
                return Err(BacktestError::integrity(format!(
                    "timestamp {} does not follow {prev}",
                    market.timestamp
                )));
            }
        }
        last_timestamp = Some(market.timestamp);
        bar_count += 1;
        if !market.is_complete() {
            gap_count += 1;
            debug!(date = %market.timestamp, gaps = ?market.gaps().collect::<Vec<_>>(), "data gap");
        }

        queue.push(market);
        while let Some(event) = queue.pop() {
            counts.record(event.kind());
            match &event {
                Event::Market(market) => {
                    let parked = execution.on_market(market);
                    portfolio.on_market(market);
                    let signal = strategy.evaluate(market);
                    queue.extend(parked);
                    if let Some(signal) = signal {
                        queue.push(signal);
                    }
                }
                Event::Signal(signal) => queue.extend(portfolio.on_signal(signal)),
                Event::Order(order) => {
                    if let Some(fill) = execution.on_order(order) {
                        queue.push(fill);
                    }
                }
                Event::Fill(fill) => {
                    portfolio.on_fill(fill);
                    fills.push(fill.clone());
                }
            }
            events.push(event);
        }
    }

    let unfilled_orders = execution.pending_orders().to_vec();
    if !unfilled_orders.is_empty() {
        warn!(count = unfilled_orders.len(), "orders still parked at end of data");
    }

    let round_trips = extract_round_trips(&fills);
    let state = portfolio.state().clone();
    let tracker = portfolio.equity_tracker();
    let metrics = PerformanceMetrics::compute(
        &tracker.totals(),
        &round_trips,
        state.initial_capital,
        state.total_commission,
        annualization,
    );

    info!(
        bars = bar_count,
        events = counts.total(),
        fills = fills.len(),
        trades = round_trips.len(),
        rejections = portfolio.rejections().len(),
        total_return = metrics.total_return,
        sharpe = metrics.sharpe_ratio,
        "backtest finished"
    );

    Ok(RunResult {
        symbols,
        equity: tracker.rows(),
        fills,
        round_trips,
        metrics,
        rejections: portfolio.rejections().to_vec(),
        events,
        counts,
        unfilled_orders,
        diagnostics: strategy.diagnostics(),
        final_state: state,
        bar_count,
        gap_count,
    })
}

/// Structural checks on the input before any event is produced.
fn check_integrity(aligned: &AlignedData, config: &EngineConfig) -> Result<(), BacktestError> {
    let expected: BTreeSet<&str> = config.pair.symbols().into_iter().collect();
    let found: BTreeSet<&str> = aligned.symbols.iter().map(String::as_str).collect();
    if aligned.symbols.len() != 2 || found != expected {
        return Err(BacktestError::integrity(format!(
            "pair run needs exactly {} and {}, data has {:?}",
            config.pair.leg_a, config.pair.leg_b, aligned.symbols
        )));
    }
    if let Some(w) = aligned.dates.windows(2).find(|w| w[1] <= w[0]) {
        return Err(BacktestError::integrity(format!(
            "timestamps not strictly increasing: {} then {}",
            w[0], w[1]
        )));
    }
    for symbol in &aligned.symbols {
        let slots = aligned.bars.get(symbol).map_or(0, Vec::len);
        if slots != aligned.len() {
            return Err(BacktestError::integrity(format!(
                "{symbol} has {slots} bar slots for {} timestamps",
                aligned.len()
            )));
        }
    }
    Ok(())
}
