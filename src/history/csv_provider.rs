//! CSV directory provider
//!
//! Reads `<directory>/<TICKER>.csv` files in the usual daily export layout:
//!
//! ```text
//! Date,Open,High,Low,Close,Volume
//! 2024-01-02 00:00:00-05:00,187.15,188.44,183.89,185.64,82488700
//! ```
//!
//! Extra columns (dividends, splits, adjusted close) are ignored.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::provider::{HistoryProvider, RawBar};
use crate::calendar::Period;
use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    directory: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, ticker: &str) -> AnalysisResult<PathBuf> {
        // Tickers become file names, so only symbol characters are allowed
        let valid = !ticker.is_empty()
            && ticker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_'))
            && !ticker.starts_with('.');
        if !valid {
            return Err(AnalysisError::invalid_parameter(
                "ticker",
                format!("`{}` is not a valid ticker symbol", ticker),
            ));
        }
        Ok(self.directory.join(format!("{}.csv", ticker)))
    }
}

impl HistoryProvider for CsvDirectoryProvider {
    fn fetch_history(&self, ticker: &str, period: Period) -> AnalysisResult<Vec<RawBar>> {
        let path = self.path_for(ticker)?;
        if !path.is_file() {
            return Err(AnalysisError::unavailable(ticker, "unknown ticker"));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| AnalysisError::unavailable(ticker, format!("cannot open {}: {}", path.display(), e)))?;

        let mut rows = Vec::new();
        for (line, record) in reader.deserialize::<RawBar>().enumerate() {
            match record {
                Ok(row) => rows.push(row),
                Err(e) => {
                    // Kept as an empty row so normalization counts it as dropped
                    debug!(ticker, line = line + 2, error = %e, "unreadable CSV record");
                    rows.push(RawBar::default());
                }
            }
        }

        if rows.is_empty() {
            return Err(AnalysisError::unavailable(ticker, "provider returned no rows"));
        }

        info!(ticker, %period, rows = rows.len(), path = %path.display(), "loaded price history file");
        Ok(rows)
    }
}
