//! Trading Calendar and History Periods
//!
//! Periods select how much history a request covers. The window always ends
//! at the latest bar the provider returned, so the same file yields the same
//! window no matter when it is read.
//!
//! Trading schedule used for day arithmetic:
//! - Trading days: Monday-Friday (no weekends)
//! - No exchange holidays; simulated horizons skip weekends only, while
//!   history windows count the bars the provider actually has

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

/// Trading days per year, used to annualize daily statistics
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Closed set of history periods a request may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "5d")]
    FiveDays,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Max,
        Period::OneYear,
        Period::SixMonths,
        Period::OneMonth,
        Period::FiveDays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Max => "max",
            Period::OneYear => "1y",
            Period::SixMonths => "6mo",
            Period::OneMonth => "1mo",
            Period::FiveDays => "5d",
        }
    }

    /// First date (inclusive) of the window ending at `last`
    ///
    /// Returns `None` for `max` and for session-count periods.
    pub fn window_start(&self, last: NaiveDate) -> Option<NaiveDate> {
        let months = match self {
            Period::Max | Period::FiveDays => return None,
            Period::OneYear => 12,
            Period::SixMonths => 6,
            Period::OneMonth => 1,
        };
        // Subtracting months only fails before year -262143
        Some(last.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN))
    }

    /// Number of trailing sessions for periods counted in bars, not dates
    ///
    /// Exchange holidays have no bar, so `5d` is the last five bars rather
    /// than the last five weekdays.
    pub fn sessions(&self) -> Option<usize> {
        match self {
            Period::FiveDays => Some(5),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                AnalysisError::invalid_parameter(
                    "period",
                    format!("unknown period `{}` (expected max, 1y, 6mo, 1mo or 5d)", trimmed),
                )
            })
    }
}

/// Weekday trading calendar
#[derive(Debug, Clone, Copy, Default)]
pub struct TradingCalendar;

impl TradingCalendar {
    pub fn new() -> Self {
        Self
    }

    /// Monday-Friday are trading days
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Get the next trading day after the given day
    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut candidate = date.succ_opt().unwrap_or(NaiveDate::MAX);
        while !self.is_trading_day(candidate) {
            candidate = candidate.succ_opt().unwrap_or(NaiveDate::MAX);
        }
        candidate
    }

    /// The `count` trading days following `start`, used to date simulated steps
    pub fn trading_days_after(&self, start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count);
        let mut current = start;
        for _ in 0..count {
            current = self.next_trading_day(current);
            days.push(current);
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("max", Period::Max)]
    #[case("1y", Period::OneYear)]
    #[case("6mo", Period::SixMonths)]
    #[case("1mo", Period::OneMonth)]
    #[case(" 5D ", Period::FiveDays)]
    fn test_period_parse(#[case] raw: &str, #[case] expected: Period) {
        assert_eq!(raw.parse::<Period>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_period_rejected() {
        let err = "2w".parse::<Period>().unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn test_period_serde_uses_short_names() {
        let yaml = serde_yaml::to_string(&Period::SixMonths).unwrap();
        assert!(yaml.contains("6mo"));
        let parsed: Period = serde_yaml::from_str("1mo").unwrap();
        assert_eq!(parsed, Period::OneMonth);
    }

    #[rstest]
    #[case(Period::Max, None)]
    #[case(Period::OneYear, Some(date(2023, 3, 15)))]
    #[case(Period::SixMonths, Some(date(2023, 9, 15)))]
    #[case(Period::OneMonth, Some(date(2024, 2, 15)))]
    #[case(Period::FiveDays, None)]
    fn test_window_start(#[case] period: Period, #[case] expected: Option<NaiveDate>) {
        assert_eq!(period.window_start(date(2024, 3, 15)), expected);
    }

    #[test]
    fn test_only_five_days_counts_sessions() {
        assert_eq!(Period::FiveDays.sessions(), Some(5));
        assert!(Period::ALL
            .iter()
            .filter(|p| **p != Period::FiveDays)
            .all(|p| p.sessions().is_none()));
    }

    #[test]
    fn test_weekends_are_not_trading_days() {
        let cal = TradingCalendar::new();
        assert!(cal.is_trading_day(date(2024, 3, 15))); // Friday
        assert!(!cal.is_trading_day(date(2024, 3, 16))); // Saturday
        assert!(!cal.is_trading_day(date(2024, 3, 17))); // Sunday
        assert_eq!(cal.next_trading_day(date(2024, 3, 15)), date(2024, 3, 18));
    }

    #[test]
    fn test_trading_days_after_skips_weekend() {
        let cal = TradingCalendar::new();
        let days = cal.trading_days_after(date(2024, 3, 14), 3);
        assert_eq!(days, vec![date(2024, 3, 15), date(2024, 3, 18), date(2024, 3, 19)]);
    }
}
