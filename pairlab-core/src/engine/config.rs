//! Engine configuration and its validation.

use crate::domain::PairId;
use crate::execution::{CommissionModel, FillPolicy};
use crate::metrics::DEFAULT_ANNUALIZATION;
use crate::strategy::PairsConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration rejected before the first event is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// Everything a pair backtest needs besides the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pair: PairId,
    pub initial_capital: f64,
    pub strategy: PairsConfig,
    /// Fraction of equity committed as gross notional per entry.
    pub allocation: f64,
    pub commission: CommissionModel,
    pub fill_policy: FillPolicy,
    /// Periods per year used to annualize the Sharpe ratio.
    pub annualization: f64,
}

impl EngineConfig {
    pub fn new(pair: PairId, initial_capital: f64) -> Self {
        Self {
            pair,
            initial_capital,
            strategy: PairsConfig::default(),
            allocation: 0.5,
            commission: CommissionModel::default(),
            fill_policy: FillPolicy::default(),
            annualization: DEFAULT_ANNUALIZATION,
        }
    }

    pub fn with_strategy(mut self, strategy: PairsConfig) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_allocation(mut self, allocation: f64) -> Self {
        self.allocation = allocation;
        self
    }

    pub fn with_commission(mut self, commission: CommissionModel) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_fill_policy(mut self, fill_policy: FillPolicy) -> Self {
        self.fill_policy = fill_policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pair.leg_a.is_empty() || self.pair.leg_b.is_empty() {
            return Err(ConfigError::invalid("pair", "symbols must be non-empty"));
        }
        if self.pair.leg_a == self.pair.leg_b {
            return Err(ConfigError::invalid("pair", "legs must be different symbols"));
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::invalid(
                "initial_capital",
                "must be positive and finite",
            ));
        }
        if !(self.allocation.is_finite() && self.allocation > 0.0) {
            return Err(ConfigError::invalid("allocation", "must be positive and finite"));
        }
        if !(self.annualization.is_finite() && self.annualization > 0.0) {
            return Err(ConfigError::invalid("annualization", "must be positive and finite"));
        }
        self.strategy.validate()?;
        self.commission.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::new(PairId::new("AAA", "BBB"), 100_000.0)
    }

    #[test]
    fn defaults_are_valid() {
        let c = config();
        assert!(c.validate().is_ok());
        assert_eq!(c.allocation, 0.5);
        assert_eq!(c.fill_policy, FillPolicy::NextBarOpen);
        assert_eq!(c.strategy.lookback, 100);
    }

    #[test]
    fn rejects_non_positive_capital() {
        let mut c = config();
        c.initial_capital = 0.0;
        let err = c.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidConfiguration {
                field: "initial_capital",
                reason: "must be positive and finite".into()
            }
        );
    }

    #[test]
    fn rejects_identical_legs() {
        let c = EngineConfig::new(PairId::new("AAA", "AAA"), 1_000.0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn surfaces_strategy_and_commission_errors() {
        let c = config().with_strategy(PairsConfig {
            z_entry: -1.0,
            ..PairsConfig::default()
        });
        assert!(c.validate().unwrap_err().to_string().contains("z_entry"));

        let c = config().with_commission(CommissionModel::Fixed { amount: -2.0 });
        assert!(c.validate().is_err());
    }
}
