//! Price History
//!
//! Normalizes provider rows into a date-ordered OHLCV series for one ticker.
//!
//! Normalization is lossy: rows whose date cannot be parsed,
//! rows with a missing or non-finite price/volume field, rows with negative
//! volume, and earlier duplicates of a date are discarded. The number of
//! discarded rows is reported on [`PriceHistory::dropped_rows`] so callers can
//! surface it.

pub mod csv_provider;
pub mod provider;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::warn;

use crate::calendar::Period;
use crate::error::{AnalysisError, AnalysisResult};

pub use csv_provider::CsvDirectoryProvider;
pub use provider::{HistoryProvider, InMemoryProvider, RawBar};

/// One trading day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bars of one ticker with strictly increasing dates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, rejecting unordered dates and negative volume
    pub fn new(bars: Vec<Bar>) -> AnalysisResult<Self> {
        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(AnalysisError::invalid_parameter(
                "bars",
                format!("dates must be strictly increasing ({} then {})", pair[0].date, pair[1].date),
            ));
        }
        if let Some(bar) = bars.iter().find(|b| !(b.volume >= 0.0)) {
            return Err(AnalysisError::invalid_parameter(
                "bars",
                format!("volume must be non-negative on {}", bar.date),
            ));
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().map(|b| b.close)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars inside `period`, measured back from the last bar
    pub fn window(&self, period: Period) -> Self {
        if let Some(sessions) = period.sessions() {
            let bars = self.bars[self.bars.len().saturating_sub(sessions)..].to_vec();
            return Self { bars };
        }
        match self.last().and_then(|b| period.window_start(b.date)) {
            Some(start) => Self {
                bars: self.bars.iter().filter(|b| b.date >= start).copied().collect(),
            },
            None => self.clone(),
        }
    }
}

/// Normalized history of one ticker over one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    pub ticker: String,
    pub period: Period,
    pub series: PriceSeries,
    /// Provider rows discarded by the lossy coercion policy
    pub dropped_rows: usize,
}

impl PriceHistory {
    /// Fetch and normalize history for `ticker` from `provider`
    pub fn fetch<P>(provider: &P, ticker: &str, period: Period) -> AnalysisResult<Self>
    where
        P: HistoryProvider + ?Sized,
    {
        let ticker = normalize_ticker(ticker)?;
        let rows = provider.fetch_history(&ticker, period)?;
        Self::from_raw(&ticker, period, rows)
    }

    /// Normalize raw rows and trim them to the period window
    pub fn from_raw(ticker: &str, period: Period, rows: Vec<RawBar>) -> AnalysisResult<Self> {
        if rows.is_empty() {
            return Err(AnalysisError::unavailable(ticker, "provider returned no rows"));
        }

        let total = rows.len();
        let mut parsed: Vec<Bar> = rows.iter().filter_map(coerce_row).collect();
        let mut dropped = total - parsed.len();

        // Stable sort keeps provider order among equal dates, so the last wins
        parsed.sort_by_key(|b| b.date);
        let mut bars: Vec<Bar> = Vec::with_capacity(parsed.len());
        for bar in parsed {
            match bars.last_mut() {
                Some(prev) if prev.date == bar.date => {
                    *prev = bar;
                    dropped += 1;
                }
                _ => bars.push(bar),
            }
        }

        if dropped > 0 {
            warn!(ticker, dropped, total, "dropped malformed price rows");
        }

        if bars.is_empty() {
            return Err(AnalysisError::unavailable(
                ticker,
                format!("all {} provider rows were malformed", total),
            ));
        }

        Ok(Self {
            ticker: ticker.to_string(),
            period,
            series: PriceSeries::new(bars)?.window(period),
            dropped_rows: dropped,
        })
    }

    /// The same history narrowed to `period`
    ///
    /// Narrowing a longer history gives the bars a fetch for `period` would.
    pub fn with_period(&self, period: Period) -> Self {
        Self {
            ticker: self.ticker.clone(),
            period,
            series: self.series.window(period),
            dropped_rows: self.dropped_rows,
        }
    }

    pub fn last_close(&self) -> Option<f64> {
        self.series.last().map(|b| b.close)
    }
}

/// Trim and upper-case a ticker symbol
pub fn normalize_ticker(raw: &str) -> AnalysisResult<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(AnalysisError::invalid_parameter("ticker", "ticker must not be empty"));
    }
    Ok(ticker)
}

fn coerce_row(row: &RawBar) -> Option<Bar> {
    let date = parse_date(&row.date)?;
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let bar = Bar {
        date,
        open: finite(row.open)?,
        high: finite(row.high)?,
        low: finite(row.low)?,
        close: finite(row.close)?,
        volume: finite(row.volume)?,
    };
    (bar.volume >= 0.0).then_some(bar)
}

const DATETIME_TZ_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a provider date into a calendar date
///
/// Timestamps with an offset keep the date as written, i.e. the exchange's
/// local trading day. Returns `None` for anything unrecognized.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }
    for fmt in DATETIME_TZ_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local().date());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("2024-01-02", Some(date(2024, 1, 2)))]
    #[case("2024-01-02 00:00:00", Some(date(2024, 1, 2)))]
    #[case("2024-01-02 00:00:00-05:00", Some(date(2024, 1, 2)))]
    #[case("2024-01-02T23:30:00+09:00", Some(date(2024, 1, 2)))]
    #[case("2024/01/02", Some(date(2024, 1, 2)))]
    #[case("01/02/2024", Some(date(2024, 1, 2)))]
    #[case("2024-13-45", None)]
    #[case("yesterday", None)]
    #[case("", None)]
    fn test_parse_date(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(raw), expected);
    }

    #[test]
    fn test_malformed_rows_dropped_and_counted() {
        let rows = vec![
            RawBar::close_only("2024-01-02", 100.0, 10.0),
            RawBar::close_only("not a date", 101.0, 10.0),
            RawBar::close_only("2024-01-03", 102.0, -5.0),
            RawBar { close: None, ..RawBar::close_only("2024-01-04", 1.0, 1.0) },
            RawBar::close_only("2024-01-05", 103.0, 12.0),
        ];

        let history = PriceHistory::from_raw("AAPL", Period::Max, rows).unwrap();

        assert_eq!(history.dropped_rows, 3);
        assert_eq!(history.series.len(), 2);
        assert_eq!(history.last_close(), Some(103.0));
    }

    #[test]
    fn test_rows_sorted_and_duplicates_keep_last() {
        let rows = vec![
            RawBar::close_only("2024-01-03", 102.0, 10.0),
            RawBar::close_only("2024-01-02", 100.0, 10.0),
            RawBar::close_only("2024-01-03", 105.0, 11.0),
        ];

        let history = PriceHistory::from_raw("AAPL", Period::Max, rows).unwrap();
        let closes: Vec<f64> = history.series.closes().collect();

        assert_eq!(closes, vec![100.0, 105.0]);
        assert_eq!(history.dropped_rows, 1);
    }

    #[test]
    fn test_non_positive_close_is_kept_for_statistics_to_reject() {
        let rows = vec![
            RawBar::close_only("2024-01-02", 100.0, 10.0),
            RawBar::close_only("2024-01-03", 0.0, 10.0),
        ];
        let history = PriceHistory::from_raw("AAPL", Period::Max, rows).unwrap();
        assert_eq!(history.series.len(), 2);
        assert_eq!(history.dropped_rows, 0);
    }

    #[test]
    fn test_period_window_trims_from_latest_bar() {
        let rows: Vec<RawBar> = (1..=31)
            .map(|d| RawBar::close_only(&format!("2024-01-{:02}", d), 100.0 + d as f64, 1.0))
            .collect();

        let history = PriceHistory::from_raw("AAPL", Period::OneMonth, rows.clone()).unwrap();
        assert_eq!(history.series.first().unwrap().date, date(2024, 1, 1));
        assert_eq!(history.series.len(), 31);

        let history = PriceHistory::from_raw("AAPL", Period::FiveDays, rows.clone()).unwrap();
        assert_eq!(history.series.first().unwrap().date, date(2024, 1, 27));

        let history = PriceHistory::from_raw("AAPL", Period::Max, rows).unwrap();
        assert_eq!(history.series.len(), 31);
    }

    #[test]
    fn test_five_days_counts_sessions_across_a_holiday() {
        // Weekdays 2024-01-08..19 with Monday the 15th closed
        let rows: Vec<RawBar> = [8, 9, 10, 11, 12, 16, 17, 18, 19]
            .iter()
            .map(|d| RawBar::close_only(&format!("2024-01-{:02}", d), 100.0, 1.0))
            .collect();

        let history = PriceHistory::from_raw("AAPL", Period::FiveDays, rows).unwrap();
        let dates: Vec<NaiveDate> = history.series.bars().iter().map(|b| b.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 12), date(2024, 1, 16), date(2024, 1, 17), date(2024, 1, 18), date(2024, 1, 19)]
        );
    }

    #[test]
    fn test_with_period_matches_direct_fetch() {
        let rows: Vec<RawBar> = (1..=31)
            .map(|d| RawBar::close_only(&format!("2024-03-{:02}", d), 50.0 + d as f64, 1.0))
            .collect();
        let full = PriceHistory::from_raw("AAPL", Period::Max, rows.clone()).unwrap();
        for period in Period::ALL {
            let direct = PriceHistory::from_raw("AAPL", period, rows.clone()).unwrap();
            assert_eq!(full.with_period(period), direct);
        }
    }

    #[test]
    fn test_empty_or_fully_malformed_is_unavailable() {
        let err = PriceHistory::from_raw("AAPL", Period::Max, vec![]).unwrap_err();
        assert_eq!(err.kind(), "DataUnavailable");

        let rows = vec![RawBar::close_only("garbage", 1.0, 1.0)];
        let err = PriceHistory::from_raw("AAPL", Period::Max, rows).unwrap_err();
        assert_eq!(err.kind(), "DataUnavailable");
    }

    #[test]
    fn test_fetch_normalizes_ticker() {
        let provider = InMemoryProvider::new()
            .with_rows("MSFT", vec![RawBar::close_only("2024-01-02", 370.0, 1.0)]);
        let history = PriceHistory::fetch(&provider, "  msft ", Period::Max).unwrap();
        assert_eq!(history.ticker, "MSFT");

        let err = PriceHistory::fetch(&provider, "   ", Period::Max).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let bar = |d: u32| Bar {
            date: date(2024, 1, d),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        };
        assert!(PriceSeries::new(vec![bar(2), bar(3)]).is_ok());
        assert!(PriceSeries::new(vec![bar(3), bar(2)]).is_err());
        assert!(PriceSeries::new(vec![bar(2), bar(2)]).is_err());
    }
}
