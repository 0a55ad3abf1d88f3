//! Return Statistics
//!
//! Daily simple and log returns from consecutive closes, and the drift and
//! volatility that calibrate the Monte Carlo simulator.
//!
//! Volatility is the *sample* standard deviation of log returns (n - 1 in the
//! denominator). Drift is the Itô-corrected mean: mean(log) - variance(log) / 2.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::calendar::TRADING_DAYS_PER_YEAR;
use crate::error::{AnalysisError, AnalysisResult};
use crate::history::PriceSeries;

/// Return between the previous close and the close on `date`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnSample {
    pub date: NaiveDate,
    pub simple_return: f64,
    pub log_return: f64,
}

/// Daily drift and volatility of log returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityModel {
    pub drift: f64,
    pub stdev: f64,
}

impl VolatilityModel {
    pub fn new(drift: f64, stdev: f64) -> Self {
        Self { drift, stdev }
    }

    /// Daily stdev scaled to a trading year
    pub fn annualized_volatility(&self) -> f64 {
        self.stdev * TRADING_DAYS_PER_YEAR.sqrt()
    }

    /// Daily drift scaled to a trading year
    pub fn annualized_drift(&self) -> f64 {
        self.drift * TRADING_DAYS_PER_YEAR
    }
}

/// Compute per-day returns and the volatility model of a series
///
/// Needs at least two bars. Any close that is not strictly positive fails
/// with `InvalidPrice`, since its log return is undefined. With exactly two
/// bars the sample variance is undefined and comes back as NaN.
pub fn compute(series: &PriceSeries) -> AnalysisResult<(Vec<ReturnSample>, VolatilityModel)> {
    let bars = series.bars();
    if bars.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            actual: bars.len(),
        });
    }
    if let Some(bad) = bars.iter().find(|b| !(b.close > 0.0)) {
        return Err(AnalysisError::InvalidPrice {
            date: bad.date.to_string(),
            close: bad.close,
        });
    }

    let samples: Vec<ReturnSample> = bars
        .windows(2)
        .map(|w| {
            let simple_return = (w[1].close - w[0].close) / w[0].close;
            ReturnSample {
                date: w[1].date,
                simple_return,
                log_return: simple_return.ln_1p(),
            }
        })
        .collect();

    let model = volatility_model(&samples);
    Ok((samples, model))
}

/// Drift and sample volatility of a set of log returns
pub fn volatility_model(samples: &[ReturnSample]) -> VolatilityModel {
    let mean = samples.iter().map(|s| s.log_return).mean();
    let variance = samples.iter().map(|s| s.log_return).variance();
    VolatilityModel {
        drift: mean - 0.5 * variance,
        stdev: variance.sqrt(),
    }
}
