//! Rolling window statistics for pair strategies.

pub mod regression;
pub mod rolling;

pub use regression::{dickey_fuller, ols, DickeyFuller, Ols};
pub use rolling::{PairStats, PriceHistory, RollingPair};
