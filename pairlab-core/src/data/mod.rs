//! Market data: providers, pair alignment, and bar replay.

pub mod align;
pub mod csv_provider;
pub mod handler;
pub mod provider;
pub mod yahoo;

pub use align::{align_bars, align_symbols, AlignedData};
pub use csv_provider::CsvProvider;
pub use handler::{DataHandler, HistoricBarHandler};
pub use provider::{clip_and_sort, DataError, DataProvider, DataSource, FetchResult, RawBar};
pub use yahoo::YahooProvider;
