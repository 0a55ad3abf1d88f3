//! Analysis Pipeline
//!
//! Runs history → return statistics → {volume buckets, Monte Carlo} for one
//! request and packages the numeric series for rendering. Statistics always
//! see the whole history; the requested period only trims the price chart.
//! Nothing here is cached; hosts memoize if they want to.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::buckets::{bucketize, VolumeBucket};
use crate::calendar::{Period, TradingCalendar};
use crate::config::Config;
use crate::error::{AnalysisError, AnalysisResult};
use crate::history::{PriceHistory, PriceSeries};
use crate::returns::{compute, ReturnSample, VolatilityModel};
use crate::simulation::{simulate, HistogramBin, RngNormals, SimulationResult, TerminalSummary};

/// Bins in the terminal-price histogram
pub const HISTOGRAM_BINS: usize = 30;

/// Everything one dashboard refresh asks for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub period: Period,
    pub days: usize,
    pub trials: usize,
    /// `None` draws a fresh seed, which is reported back
    pub seed: Option<u64>,
    pub buckets: usize,
}

impl AnalysisRequest {
    /// Request built from the configured defaults
    pub fn from_config(config: &Config) -> Self {
        Self {
            ticker: config.defaults.ticker.clone(),
            period: config.defaults.period,
            days: config.simulation.days,
            trials: config.simulation.trials,
            seed: config.simulation.seed,
            buckets: config.buckets.count,
        }
    }

    /// Reject trial counts above the configured ceiling
    pub fn check_limits(&self, max_trials: usize) -> AnalysisResult<()> {
        if self.trials > max_trials {
            return Err(AnalysisError::invalid_parameter(
                "trials",
                format!("at most {} trials are allowed, got {}", max_trials, self.trials),
            ));
        }
        Ok(())
    }
}

/// Monte Carlo forecast for one history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub last_date: NaiveDate,
    pub last_close: f64,
    pub volatility: VolatilityModel,
    /// Seed that reproduces this run
    pub seed: u64,
    /// Trading dates of simulated steps 1..=days
    pub horizon: Vec<NaiveDate>,
    pub simulation: SimulationResult,
    pub summary: TerminalSummary,
    pub histogram: Vec<HistogramBin>,
}

/// Full report behind the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub ticker: String,
    pub period: Period,
    pub dropped_rows: usize,
    pub prices: PriceSeries,
    pub returns: Vec<ReturnSample>,
    pub volatility: VolatilityModel,
    pub buckets: Vec<VolumeBucket>,
    pub forecast: Forecast,
}

/// Mean return per volume bucket over the history
pub fn volume_profile(history: &PriceHistory, num_buckets: usize) -> AnalysisResult<Vec<VolumeBucket>> {
    let (returns, _) = compute(&history.series)?;
    bucketize(&history.series, &returns, num_buckets)
}

/// Simulate `trials` paths of `days` steps from the last close of `history`
pub fn forecast(
    history: &PriceHistory,
    days: usize,
    trials: usize,
    seed: Option<u64>,
) -> AnalysisResult<Forecast> {
    let (_, volatility) = compute(&history.series)?;
    forecast_with_model(history, volatility, days, trials, seed)
}

fn forecast_with_model(
    history: &PriceHistory,
    volatility: VolatilityModel,
    days: usize,
    trials: usize,
    seed: Option<u64>,
) -> AnalysisResult<Forecast> {
    let last = history.series.last().ok_or_else(|| {
        AnalysisError::unavailable(history.ticker.as_str(), "history is empty")
    })?;

    let seed = seed.unwrap_or_else(rand::random);
    let mut draws = RngNormals::seeded(seed);
    let simulation = simulate(&volatility, last.close, days, trials, &mut draws)?;
    let summary = simulation.summary();
    let histogram = simulation.histogram(HISTOGRAM_BINS)?;

    info!(
        ticker = %history.ticker,
        days,
        trials,
        seed,
        median = summary.median,
        "monte carlo simulation finished"
    );

    Ok(Forecast {
        last_date: last.date,
        last_close: last.close,
        volatility,
        seed,
        horizon: TradingCalendar::new().trading_days_after(last.date, days),
        simulation,
        summary,
        histogram,
    })
}

/// Run every analysis for `request` over an already loaded history
///
/// Returns, buckets and the forecast use all of `history`; `request.period`
/// only narrows the `prices` series shown alongside them. Pass the `max`
/// history so a short period does not starve the statistics.
pub fn analyze(history: &PriceHistory, request: &AnalysisRequest) -> AnalysisResult<AnalysisReport> {
    let (returns, volatility) = compute(&history.series)?;
    let buckets = bucketize(&history.series, &returns, request.buckets)?;
    let forecast = forecast_with_model(history, volatility, request.days, request.trials, request.seed)?;

    Ok(AnalysisReport {
        ticker: history.ticker.clone(),
        period: request.period,
        dropped_rows: history.dropped_rows,
        prices: history.series.window(request.period),
        returns,
        volatility,
        buckets,
        forecast,
    })
}
