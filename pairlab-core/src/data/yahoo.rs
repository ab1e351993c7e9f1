//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API with a blocking client,
//! retrying transient failures with exponential backoff. A 403 marks the
//! provider unavailable for the rest of the process.
//!
//! The chart API is unofficial and changes without notice; `CsvProvider` is
//! the fallback when it is unavailable.

use super::provider::{clip_and_sort, DataError, DataProvider, DataSource, FetchResult, RawBar};
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(Result<Vec<RawBar>, DataError>),
    Retry(DataError),
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
    blocked: AtomicBool,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) pairlab")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            blocked: AtomicBool::new(false),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp());
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map_or(start_ts, |dt| dt.and_utc().timestamp());
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d&includeAdjustedClose=true"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let format_err = |msg: &str| DataError::ResponseFormatChanged(msg.to_string());

        let Some(result) = resp.chart.result else {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                },
                Some(err) => format_err(&format!("{}: {}", err.code, err.description)),
                None => format_err("empty result with no error"),
            });
        };
        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| format_err("result array is empty"))?;
        let timestamps = data.timestamp.ok_or_else(|| format_err("no timestamps"))?;
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| format_err("no quote data"))?;
        let adj = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();
        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| format_err(&format!("invalid timestamp: {ts}")))?;
            let close = at(&quote.close, i);
            // Non-trading rows come back with every field null.
            let Some(close) = close else {
                continue;
            };
            bars.push(RawBar {
                date,
                open: at(&quote.open, i).unwrap_or(f64::NAN),
                high: at(&quote.high, i).unwrap_or(f64::NAN),
                low: at(&quote.low, i).unwrap_or(f64::NAN),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
                adj_close: at(&adj, i).unwrap_or(close),
            });
        }
        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }

    fn attempt(&self, url: &str, symbol: &str) -> Attempt {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Attempt::Retry(DataError::NetworkUnreachable(e.to_string()))
            }
            Err(e) => return Attempt::Done(Err(DataError::NetworkUnreachable(e.to_string()))),
        };

        match resp.status() {
            StatusCode::FORBIDDEN => {
                self.blocked.store(true, Ordering::Relaxed);
                Attempt::Done(Err(DataError::Other(
                    "Yahoo Finance refused the request (HTTP 403)".into(),
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Attempt::Retry(DataError::RateLimited { retry_after_secs })
            }
            status if !status.is_success() => {
                Attempt::Retry(DataError::Other(format!("HTTP {status} for {symbol}")))
            }
            _ => Attempt::Done(
                resp.json::<ChartResponse>()
                    .map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })
                    .and_then(|chart| Self::parse_response(symbol, chart)),
            ),
        }
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let url = Self::chart_url(symbol, start, end);
        let mut last_error = DataError::Other("max retries exceeded".into());

        for attempt in 0..=self.max_retries {
            if !self.is_available() {
                return Err(DataError::Other("Yahoo Finance is blocking requests".into()));
            }
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying");
                std::thread::sleep(delay);
            }
            match self.attempt(&url, symbol) {
                Attempt::Done(result) => return result,
                Attempt::Retry(err) => {
                    warn!(symbol, attempt, error = %err, "yahoo request failed");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let bars = clip_and_sort(self.fetch_with_retry(symbol, start, end)?, start, end);
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        !self.blocked.load(Ordering::Relaxed)
    }
}
