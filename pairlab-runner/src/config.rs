//! TOML backtest configuration.
//!
//! ```toml
//! [backtest]
//! symbols = ["AAPL", "MSFT"]
//! start_date = "2020-01-01"
//! end_date = "2023-01-01"
//! initial_capital = 100000.0
//!
//! [strategy]
//! lookback = 100
//! z_entry = 2.0
//! z_exit = 0.5
//!
//! [portfolio]
//! allocation = 0.5
//!
//! [execution]
//! fill_policy = "next_bar_open"
//! commission = { type = "fixed", amount = 1.0 }
//! ```
//!
//! Every section except `[backtest]` may be omitted; missing keys take the
//! engine defaults.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pairlab_core::domain::PairId;
use pairlab_core::engine::EngineConfig;
use pairlab_core::execution::{CommissionModel, FillPolicy};
use pairlab_core::metrics::DEFAULT_ANNUALIZATION;
use pairlab_core::strategy::PairsConfig;

/// Content-addressed identifier of a run (BLAKE3 hex of the config).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("a pair backtest needs exactly two symbols, got {count}")]
    SymbolCount { count: usize },

    #[error("start_date {start} is after end_date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Engine(#[from] pairlab_core::engine::ConfigError),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: PairsConfig,
    #[serde(default)]
    pub portfolio: PortfolioSection,
    #[serde(default)]
    pub execution: ExecutionSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    /// `[leg_a, leg_b]`; the spread is `leg_a - beta * leg_b`.
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Periods per year for the Sharpe ratio.
    #[serde(default = "default_annualization")]
    pub annualization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSection {
    /// Fraction of equity committed as gross notional per entry.
    #[serde(default = "default_allocation")]
    pub allocation: f64,
}

impl Default for PortfolioSection {
    fn default() -> Self {
        Self {
            allocation: default_allocation(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSection {
    #[serde(default)]
    pub fill_policy: FillPolicy,
    #[serde(default)]
    pub commission: CommissionModel,
}

fn default_initial_capital() -> f64 {
    100_000.0
}

fn default_annualization() -> f64 {
    DEFAULT_ANNUALIZATION
}

fn default_allocation() -> f64 {
    0.5
}

impl BacktestConfig {
    /// Config for one pair over a date range with every other knob at its default.
    pub fn new(
        leg_a: impl Into<String>,
        leg_b: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            backtest: BacktestSection {
                symbols: vec![leg_a.into(), leg_b.into()],
                start_date,
                end_date,
                initial_capital: default_initial_capital(),
                annualization: default_annualization(),
            },
            strategy: PairsConfig::default(),
            portfolio: PortfolioSection::default(),
            execution: ExecutionSection::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Same settings, different pair.
    pub fn with_pair(&self, leg_a: impl Into<String>, leg_b: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.backtest.symbols = vec![leg_a.into(), leg_b.into()];
        config
    }

    pub fn pair(&self) -> Result<PairId, ConfigError> {
        match self.backtest.symbols.as_slice() {
            [a, b] => Ok(PairId::new(a.clone(), b.clone())),
            other => Err(ConfigError::SymbolCount { count: other.len() }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.start_date > self.backtest.end_date {
            return Err(ConfigError::DateRange {
                start: self.backtest.start_date,
                end: self.backtest.end_date,
            });
        }
        self.to_engine_config().map(|_| ())
    }

    /// Engine view of this config, validated.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut engine = EngineConfig::new(self.pair()?, self.backtest.initial_capital)
            .with_strategy(self.strategy.clone())
            .with_allocation(self.portfolio.allocation)
            .with_commission(self.execution.commission)
            .with_fill_policy(self.execution.fill_policy);
        engine.annualization = self.backtest.annualization;
        engine.validate()?;
        Ok(engine)
    }

    /// Deterministic hash of every setting. Two identical configs share a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[backtest]
symbols = ["AAPL", "MSFT"]
start_date = "2020-01-01"
end_date = "2023-01-01"
initial_capital = 100000.0

[strategy]
lookback = 100
z_entry = 2.0
z_exit = 0.5

[portfolio]
allocation = 0.5

[execution]
fill_policy = "next_bar_open"
commission = { type = "fixed", amount = 1.0 }
"#;

    #[test]
    fn parses_full_file() {
        let config = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(config.backtest.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(
            config.backtest.start_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert_eq!(config.strategy.lookback, 100);
        assert_eq!(config.execution.fill_policy, FillPolicy::NextBarOpen);
        assert_eq!(
            config.execution.commission,
            CommissionModel::Fixed { amount: 1.0 }
        );

        let engine = config.to_engine_config().unwrap();
        assert_eq!(engine.pair, PairId::new("AAPL", "MSFT"));
        assert_eq!(engine.allocation, 0.5);
        assert_eq!(engine.annualization, 252.0);
    }

    #[test]
    fn optional_sections_take_defaults() {
        let config = BacktestConfig::from_toml(
            r#"
[backtest]
symbols = ["KO", "PEP"]
start_date = "2021-01-01"
end_date = "2021-12-31"

[strategy]
z_entry = 1.5
"#,
        )
        .unwrap();
        assert_eq!(config.backtest.initial_capital, 100_000.0);
        assert_eq!(config.strategy.lookback, 100);
        assert_eq!(config.strategy.z_entry, 1.5);
        assert_eq!(config.portfolio.allocation, 0.5);
        assert_eq!(config.execution, ExecutionSection::default());
    }

    #[test]
    fn percent_commission_and_close_fills() {
        let toml = FULL
            .replace("next_bar_open", "signal_bar_close")
            .replace(
                r#"{ type = "fixed", amount = 1.0 }"#,
                r#"{ type = "percent", rate = 0.0005 }"#,
            );
        let config = BacktestConfig::from_toml(&toml).unwrap();
        assert_eq!(config.execution.fill_policy, FillPolicy::SignalBarClose);
        assert_eq!(
            config.execution.commission,
            CommissionModel::Percent { rate: 0.0005 }
        );
    }

    #[test]
    fn rejects_three_symbols() {
        let toml = FULL.replace(r#"["AAPL", "MSFT"]"#, r#"["AAPL", "MSFT", "GOOG"]"#);
        let err = BacktestConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::SymbolCount { count: 3 }));
    }

    #[test]
    fn rejects_inverted_dates() {
        let toml = FULL.replace("2020-01-01", "2024-01-01");
        let err = BacktestConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::DateRange { .. }));
    }

    #[test]
    fn engine_validation_surfaces() {
        let toml = FULL.replace("z_exit = 0.5", "z_exit = 3.0");
        let err = BacktestConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Engine(_)));
        assert!(err.to_string().contains("z_exit"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = BacktestConfig::from_toml("[backtest\nsymbols = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BacktestConfig::from_file(Path::new("/nonexistent/pairlab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn run_id_is_stable_and_sensitive() {
        let a = BacktestConfig::from_toml(FULL).unwrap();
        let b = BacktestConfig::from_toml(FULL).unwrap();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);

        let c = a.with_pair("KO", "PEP");
        assert_ne!(a.run_id().unwrap(), c.run_id().unwrap());
    }
}
