//! Pairs trading on the z-score of a rolling hedge-ratio spread.
//!
//! For each timestamp with valid closes for both legs:
//!
//! 1. Append both closes to the rolling window (bounded to `lookback`).
//! 2. Regress A on B over the window: `beta`, spread mean and deviation.
//! 3. `z = (A - beta * B - mean) / std`.
//! 4. Exit first: an open spread with `|z| < z_exit` is closed. Otherwise a
//!    flat book enters LONG below `-z_entry` or SHORT above `z_entry`.
//!
//! A timestamp where either leg is missing or non-finite is skipped whole:
//! neither window is touched.

use super::{SkipReason, Strategy, StrategyDiagnostics};
use crate::domain::{IdGen, MarketEvent, PairId, SignalEvent, SignalType};
use crate::engine::ConfigError;
use crate::stats::{dickey_fuller, PairStats, RollingPair};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Tunables for the pairs strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairsConfig {
    /// Rolling window length `L` in bars.
    pub lookback: usize,
    pub z_entry: f64,
    pub z_exit: f64,
    /// When set, entries require the spread's Dickey-Fuller p-value below this.
    pub adf_p_threshold: Option<f64>,
    /// Exact resync interval of the rolling sums; defaults to `lookback`.
    pub resync_interval: Option<usize>,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            lookback: 100,
            z_entry: 2.0,
            z_exit: 0.5,
            adf_p_threshold: None,
            resync_interval: None,
        }
    }
}

impl PairsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback < 2 {
            return Err(ConfigError::invalid("lookback", "must be greater than 1"));
        }
        if !(self.z_entry.is_finite() && self.z_entry > 0.0) {
            return Err(ConfigError::invalid("z_entry", "must be positive and finite"));
        }
        if !(self.z_exit.is_finite() && self.z_exit >= 0.0 && self.z_exit < self.z_entry) {
            return Err(ConfigError::invalid(
                "z_exit",
                "must satisfy 0 <= z_exit < z_entry",
            ));
        }
        if let Some(p) = self.adf_p_threshold {
            if !(p > 0.0 && p < 1.0) {
                return Err(ConfigError::invalid("adf_p_threshold", "must be in (0, 1)"));
            }
        }
        if self.resync_interval == Some(0) {
            return Err(ConfigError::invalid("resync_interval", "must be at least 1"));
        }
        Ok(())
    }
}

/// Position of the spread as last signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpreadState {
    #[default]
    Flat,
    LongSpread,
    ShortSpread,
}

impl SpreadState {
    fn after(signal: SignalType) -> Self {
        match signal {
            SignalType::Long => SpreadState::LongSpread,
            SignalType::Short => SpreadState::ShortSpread,
            SignalType::Exit => SpreadState::Flat,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PairsTradingStrategy {
    pair: PairId,
    config: PairsConfig,
    window: RollingPair,
    state: SpreadState,
    ids: IdGen,
    last_stats: Option<PairStats>,
    last_z: Option<f64>,
    diagnostics: StrategyDiagnostics,
}

impl PairsTradingStrategy {
    pub fn new(pair: PairId, config: PairsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = match config.resync_interval {
            Some(every) => RollingPair::with_resync_interval(config.lookback, every),
            None => RollingPair::new(config.lookback),
        };
        Ok(Self {
            pair,
            config,
            window,
            state: SpreadState::Flat,
            ids: IdGen::default(),
            last_stats: None,
            last_z: None,
            diagnostics: StrategyDiagnostics::default(),
        })
    }

    pub fn pair(&self) -> &PairId {
        &self.pair
    }

    pub fn config(&self) -> &PairsConfig {
        &self.config
    }

    pub fn state(&self) -> SpreadState {
        self.state
    }

    pub fn window(&self) -> &RollingPair {
        &self.window
    }

    pub fn last_stats(&self) -> Option<&PairStats> {
        self.last_stats.as_ref()
    }

    pub fn last_z(&self) -> Option<f64> {
        self.last_z
    }

    fn skip(&mut self, market: &MarketEvent, reason: SkipReason) -> Option<SignalEvent> {
        self.diagnostics.record_skip(reason);
        match reason {
            SkipReason::InsufficientData => trace!(
                date = %market.timestamp,
                have = self.window.len(),
                need = self.config.lookback,
                "insufficient history"
            ),
            _ => debug!(date = %market.timestamp, pair = %self.pair, ?reason, "no signal"),
        }
        None
    }

    /// Exit first, then entries from flat only.
    fn decide(&self, z: f64) -> Option<SignalType> {
        if self.state != SpreadState::Flat && z.abs() < self.config.z_exit {
            return Some(SignalType::Exit);
        }
        if self.state == SpreadState::Flat {
            if z < -self.config.z_entry {
                return Some(SignalType::Long);
            }
            if z > self.config.z_entry {
                return Some(SignalType::Short);
            }
        }
        None
    }

    fn is_cointegrated(&self, stats: &PairStats) -> bool {
        let Some(threshold) = self.config.adf_p_threshold else {
            return true;
        };
        let residuals = self.window.spread_series(stats.beta);
        match dickey_fuller(&residuals) {
            Some(df) => {
                trace!(
                    t_stat = df.t_stat,
                    p_value = df.p_value,
                    half_life = df.half_life,
                    "dickey-fuller"
                );
                df.p_value < threshold
            }
            None => false,
        }
    }

    fn valid_close(market: &MarketEvent, symbol: &str) -> Option<f64> {
        market.bar(symbol).and_then(|b| b.valid_close())
    }
}

impl Strategy for PairsTradingStrategy {
    fn name(&self) -> &str {
        "pairs_trading"
    }

    fn symbols(&self) -> Vec<String> {
        vec![self.pair.leg_a.clone(), self.pair.leg_b.clone()]
    }

    fn evaluate(&mut self, market: &MarketEvent) -> Option<SignalEvent> {
        self.diagnostics.evaluated += 1;

        let a = Self::valid_close(market, &self.pair.leg_a);
        let b = Self::valid_close(market, &self.pair.leg_b);
        let (Some(a), Some(b)) = (a, b) else {
            return self.skip(market, SkipReason::DataGap);
        };

        self.window.push(a, b);
        let Some(stats) = self.window.stats() else {
            return self.skip(market, SkipReason::InsufficientData);
        };
        self.last_stats = Some(stats);

        let Some(z) = stats.z_score(a, b) else {
            self.last_z = None;
            return self.skip(market, SkipReason::NumericDegenerate);
        };
        self.last_z = Some(z);

        let signal_type = self.decide(z)?;
        if signal_type != SignalType::Exit && !self.is_cointegrated(&stats) {
            return self.skip(market, SkipReason::NotCointegrated);
        }

        self.state = SpreadState::after(signal_type);
        self.diagnostics.signals += 1;
        debug!(
            date = %market.timestamp,
            pair = %self.pair,
            signal = %signal_type,
            z,
            beta = stats.beta,
            "signal"
        );

        Some(SignalEvent {
            id: self.ids.next_signal_id(),
            timestamp: market.timestamp,
            pair: self.pair.clone(),
            signal_type,
            strength: z.abs(),
            z_score: z,
            hedge_ratio: stats.beta,
        })
    }

    fn diagnostics(&self) -> StrategyDiagnostics {
        self.diagnostics.clone()
    }
}
