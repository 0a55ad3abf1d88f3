//! Market data provider interface
//!
//! Providers hand back raw rows exactly as they found them. Dates stay
//! textual and numeric fields stay optional so that normalization can apply
//! the lossy coercion policy in one place and count what it discards.

use serde::Deserialize;
use std::collections::HashMap;

use crate::calendar::Period;
use crate::error::{AnalysisError, AnalysisResult};

/// One provider row before normalization
///
/// Header names follow the common `Date,Open,High,Low,Close,Volume` export
/// layout; lower-case headers are accepted too. Unparseable numbers become
/// `None` instead of failing the whole file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawBar {
    #[serde(rename = "Date", alias = "date", alias = "Datetime", default)]
    pub date: String,
    #[serde(rename = "Open", alias = "open", default, deserialize_with = "csv::invalid_option")]
    pub open: Option<f64>,
    #[serde(rename = "High", alias = "high", default, deserialize_with = "csv::invalid_option")]
    pub high: Option<f64>,
    #[serde(rename = "Low", alias = "low", default, deserialize_with = "csv::invalid_option")]
    pub low: Option<f64>,
    #[serde(rename = "Close", alias = "close", default, deserialize_with = "csv::invalid_option")]
    pub close: Option<f64>,
    #[serde(rename = "Volume", alias = "volume", default, deserialize_with = "csv::invalid_option")]
    pub volume: Option<f64>,
}

impl RawBar {
    /// A fully populated row
    pub fn new(date: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date: date.to_string(),
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// Row where only the close and volume matter
    pub fn close_only(date: &str, close: f64, volume: f64) -> Self {
        Self::new(date, close, close, close, close, volume)
    }
}

/// Source of daily OHLCV rows
///
/// `period` is a hint: a provider may return a superset of the window and
/// `PriceHistory` trims the result. Unknown tickers and empty results must be
/// reported as `DataUnavailable`.
pub trait HistoryProvider: Send + Sync {
    fn fetch_history(&self, ticker: &str, period: Period) -> AnalysisResult<Vec<RawBar>>;
}

/// Provider backed by rows held in memory, keyed by upper-case ticker
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    rows: HashMap<String, Vec<RawBar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: &str, rows: Vec<RawBar>) {
        self.rows.insert(ticker.trim().to_ascii_uppercase(), rows);
    }

    pub fn with_rows(mut self, ticker: &str, rows: Vec<RawBar>) -> Self {
        self.insert(ticker, rows);
        self
    }
}

impl HistoryProvider for InMemoryProvider {
    fn fetch_history(&self, ticker: &str, _period: Period) -> AnalysisResult<Vec<RawBar>> {
        let rows = self
            .rows
            .get(&ticker.to_ascii_uppercase())
            .ok_or_else(|| AnalysisError::unavailable(ticker, "unknown ticker"))?;
        if rows.is_empty() {
            return Err(AnalysisError::unavailable(ticker, "provider returned no rows"));
        }
        Ok(rows.clone())
    }
}
