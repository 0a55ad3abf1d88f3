//! Error types shared by the analysis core
//!
//! Every failure of the four core operations is one of these variants.
//! Nothing in the core substitutes a default value for a failed computation.

use thiserror::Error;

/// Failures raised by history loading, return statistics, volume bucketing
/// and the Monte Carlo simulator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The provider has no rows for this ticker/period
    #[error("no price data available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    /// A close price that makes log returns undefined
    #[error("invalid close price {close} on {date}")]
    InvalidPrice { date: String, close: f64 },

    /// Too few rows for the requested statistic
    #[error("insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Malformed call arguments
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl AnalysisError {
    pub fn unavailable(ticker: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::DataUnavailable {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::DataUnavailable { .. } => "DataUnavailable",
            AnalysisError::InvalidPrice { .. } => "InvalidPrice",
            AnalysisError::InsufficientData { .. } => "InsufficientData",
            AnalysisError::InvalidParameter { .. } => "InvalidParameter",
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = AnalysisError::InsufficientData { required: 2, actual: 1 };
        assert_eq!(err.to_string(), "insufficient data: need at least 2 rows, got 1");

        let err = AnalysisError::unavailable("ZZZZ", "no rows");
        assert_eq!(err.kind(), "DataUnavailable");
        assert!(err.to_string().contains("ZZZZ"));
    }
}
