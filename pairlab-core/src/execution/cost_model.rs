//! Commission model: per-fill transaction cost.
//!
//! Commission is attached to the fill by the execution handler and debited
//! from cash by the portfolio. There is no slippage: fills print at the
//! reference price chosen by the fill policy.

use crate::engine::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommissionModel {
    /// Flat amount per fill, regardless of size.
    Fixed { amount: f64 },
    /// Fraction of fill notional (0.001 = 10 bps).
    Percent { rate: f64 },
}

impl Default for CommissionModel {
    fn default() -> Self {
        CommissionModel::Fixed { amount: 1.0 }
    }
}

impl CommissionModel {
    pub fn frictionless() -> Self {
        CommissionModel::Fixed { amount: 0.0 }
    }

    /// Commission for a fill of `quantity` at `price`.
    pub fn commission(&self, price: f64, quantity: f64) -> f64 {
        match *self {
            CommissionModel::Fixed { amount } => amount,
            CommissionModel::Percent { rate } => (price * quantity).abs() * rate,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            CommissionModel::Fixed { amount } if !(amount.is_finite() && amount >= 0.0) => Err(
                ConfigError::invalid("commission.amount", "must be non-negative and finite"),
            ),
            CommissionModel::Percent { rate } if !(rate.is_finite() && (0.0..1.0).contains(&rate)) => {
                Err(ConfigError::invalid("commission.rate", "must be in [0, 1)"))
            }
            _ => Ok(()),
        }
    }
}
