//! Monte Carlo Price Paths
//!
//! Geometric Brownian Motion with daily parameters taken straight from the
//! log-return statistics of the history:
//!
//! ```text
//! S(t) = S(t-1) * exp(drift + stdev * Z),   Z ~ N(0,1)
//! ```
//!
//! Randomness only enters through a [`NormalSource`], so a seeded source
//! reproduces a run bit for bit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Serialize;

use crate::buckets::quantile;
use crate::error::{AnalysisError, AnalysisResult};
use crate::returns::VolatilityModel;

/// Source of independent standard-normal draws
pub trait NormalSource {
    fn draw(&mut self) -> f64;
}

impl<S: NormalSource + ?Sized> NormalSource for &mut S {
    fn draw(&mut self) -> f64 {
        (**self).draw()
    }
}

/// Standard-normal draws from any `rand` generator
#[derive(Debug, Clone)]
pub struct RngNormals<R> {
    rng: R,
}

impl<R: Rng> RngNormals<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngNormals<StdRng> {
    /// Reproducible draws for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> NormalSource for RngNormals<R> {
    fn draw(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

/// Geometric Brownian Motion price stepper
#[derive(Debug, Clone, Copy)]
pub struct GBM {
    /// Daily log drift (already Itô-corrected)
    drift: f64,
    /// Daily log volatility
    stdev: f64,
}

impl GBM {
    pub fn new(drift: f64, stdev: f64) -> Self {
        Self { drift, stdev }
    }

    pub fn from_model(model: &VolatilityModel) -> Self {
        Self::new(model.drift, model.stdev)
    }

    /// Price one day after `current_price` for the draw `z`
    pub fn next_price(&self, current_price: f64, z: f64) -> f64 {
        current_price * (self.drift + self.stdev * z).exp()
    }

    /// Path of `num_days + 1` prices starting at `initial_price`
    pub fn generate_path<S>(&self, initial_price: f64, num_days: usize, draws: &mut S) -> Vec<f64>
    where
        S: NormalSource + ?Sized,
    {
        let mut prices = Vec::with_capacity(num_days + 1);
        let mut current_price = initial_price;
        prices.push(current_price);
        for _ in 0..num_days {
            current_price = self.next_price(current_price, draws.draw());
            prices.push(current_price);
        }
        prices
    }
}

/// Simulated paths and their final prices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// One path per trial, each `days + 1` long
    pub paths: Vec<Vec<f64>>,
    /// `paths[p][days]` for every path, in path order
    pub terminal_prices: Vec<f64>,
}

/// Simulate `trials` independent price paths of `days` steps
///
/// Draws are consumed path by path: every step of the first path, then every
/// step of the second, and so on. Inf and NaN from extreme parameters are
/// passed through untouched.
pub fn simulate<S>(
    model: &VolatilityModel,
    last_close: f64,
    days: usize,
    trials: usize,
    draws: &mut S,
) -> AnalysisResult<SimulationResult>
where
    S: NormalSource + ?Sized,
{
    if days < 1 {
        return Err(AnalysisError::invalid_parameter("days", "must be at least 1"));
    }
    if trials < 1 {
        return Err(AnalysisError::invalid_parameter("trials", "must be at least 1"));
    }
    if !(last_close > 0.0) {
        return Err(AnalysisError::invalid_parameter(
            "last_close",
            format!("must be positive, got {}", last_close),
        ));
    }

    let gbm = GBM::from_model(model);
    let paths: Vec<Vec<f64>> = (0..trials)
        .map(|_| gbm.generate_path(last_close, days, draws))
        .collect();
    let terminal_prices = paths.iter().map(|p| p[days]).collect();

    Ok(SimulationResult {
        paths,
        terminal_prices,
    })
}

/// Distribution summary of terminal prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TerminalSummary {
    /// Terminal prices that were finite and entered the statistics
    pub finite_count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub low: f64,
    pub high: f64,
    pub count: usize,
}

impl SimulationResult {
    pub fn trials(&self) -> usize {
        self.paths.len()
    }

    pub fn days(&self) -> usize {
        self.paths.first().map_or(0, |p| p.len().saturating_sub(1))
    }

    fn sorted_finite_terminals(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .terminal_prices
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values
    }

    /// Summary over the finite terminal prices; NaN fields when there are none
    pub fn summary(&self) -> TerminalSummary {
        let values = self.sorted_finite_terminals();
        if values.is_empty() {
            return TerminalSummary {
                finite_count: 0,
                mean: f64::NAN,
                median: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                p5: f64::NAN,
                p95: f64::NAN,
            };
        }
        TerminalSummary {
            finite_count: values.len(),
            mean: values.iter().sum::<f64>() / values.len() as f64,
            median: quantile(&values, 0.5),
            min: values[0],
            max: values[values.len() - 1],
            p5: quantile(&values, 0.05),
            p95: quantile(&values, 0.95),
        }
    }

    /// Equal-width histogram of the finite terminal prices
    pub fn histogram(&self, bins: usize) -> AnalysisResult<Vec<HistogramBin>> {
        if bins == 0 {
            return Err(AnalysisError::invalid_parameter("bins", "must be at least 1"));
        }
        let values = self.sorted_finite_terminals();
        let (min, max) = match (values.first(), values.last()) {
            (Some(&min), Some(&max)) => (min, max),
            _ => return Ok(Vec::new()),
        };

        let width = (max - min) / bins as f64;
        let mut histogram: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                low: min + width * i as f64,
                high: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
                count: 0,
            })
            .collect();

        for v in values {
            let idx = if width > 0.0 {
                (((v - min) / width) as usize).min(bins - 1)
            } else {
                0
            };
            histogram[idx].count += 1;
        }
        Ok(histogram)
    }
}
