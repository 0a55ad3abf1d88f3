//! Equity Monte Carlo - command line report
//!
//! Loads one ticker's history, prints its return statistics, the mean return
//! per volume bucket and a Monte Carlo forecast of the closing price.
//!
//! Usage:
//!   cargo run --bin equity-sim -- --config config/dashboard.yaml
//!   cargo run --bin equity-sim -- --ticker MSFT --period 1y --days 30 --trials 1000 --seed 42

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::error;

use equity_montecarlo::config::Config;
use equity_montecarlo::history::{CsvDirectoryProvider, PriceHistory};
use equity_montecarlo::logging::init_logging;
use equity_montecarlo::pipeline::{analyze, AnalysisReport, AnalysisRequest};
use equity_montecarlo::Period;

#[derive(Debug, Parser)]
#[command(name = "equity-sim", version, about = "Return statistics and Monte Carlo forecast for one ticker")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Ticker symbol
    #[arg(short, long)]
    ticker: Option<String>,
    /// History period: max, 1y, 6mo, 1mo or 5d
    #[arg(short, long)]
    period: Option<Period>,
    /// Trading days to simulate
    #[arg(long)]
    days: Option<usize>,
    /// Number of simulated paths
    #[arg(long)]
    trials: Option<usize>,
    /// Seed for reproducible paths
    #[arg(long)]
    seed: Option<u64>,
    /// Number of volume buckets
    #[arg(long)]
    buckets: Option<usize>,
    /// Directory of <TICKER>.csv files
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(ticker) = &self.ticker {
            config.defaults.ticker = ticker.clone();
        }
        if let Some(period) = self.period {
            config.defaults.period = period;
        }
        if let Some(days) = self.days {
            config.simulation.days = days;
        }
        if let Some(trials) = self.trials {
            config.simulation.trials = trials;
        }
        if self.seed.is_some() {
            config.simulation.seed = self.seed;
        }
        if let Some(buckets) = self.buckets {
            config.buckets.count = buckets;
        }
        if let Some(dir) = &self.data_dir {
            config.data.directory = dir.clone();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid settings")?;

    init_logging(&config.logging)?;

    if let Err(e) = run(&config) {
        error!("analysis failed: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

fn run(config: &Config) -> Result<()> {
    let request = AnalysisRequest::from_config(config);
    let provider = CsvDirectoryProvider::new(&config.data.directory);

    let history = PriceHistory::fetch(&provider, &request.ticker, Period::Max)?;
    let report = analyze(&history, &request)?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!("Equity Monte Carlo - {} ({})\n", report.ticker, report.period);

    let bars = report.prices.bars();
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        println!("History:");
        println!("  Bars in {}: {} ({} to {})", report.period, bars.len(), first.date, last.date);
        println!("  Dropped rows: {}", report.dropped_rows);
        println!("  Last close: ${:.2}", last.close);
        println!();
    }

    let vol = &report.volatility;
    println!("Log returns:");
    println!("  Daily drift: {:.5}% ({:.2}% annualized)", vol.drift * 100.0, vol.annualized_drift() * 100.0);
    println!("  Daily volatility: {:.4}% ({:.1}% annualized)", vol.stdev * 100.0, vol.annualized_volatility() * 100.0);
    println!();

    println!("Mean return by volume bucket:");
    for bucket in &report.buckets {
        if bucket.is_empty() {
            println!("  {:>25}  {:>4} days  n/a", bucket.label(), bucket.count);
        } else {
            println!(
                "  {:>25}  {:>4} days  {:+.3}%",
                bucket.label(),
                bucket.count,
                bucket.mean_return * 100.0
            );
        }
    }
    println!();

    let forecast = &report.forecast;
    let summary = &forecast.summary;
    println!(
        "Monte Carlo: {} paths x {} days (seed {})",
        forecast.simulation.trials(),
        forecast.simulation.days(),
        forecast.seed
    );
    if let Some(end) = forecast.horizon.last() {
        println!("  Horizon ends: {}", end);
    }
    println!("  Start price: ${:.2}", forecast.last_close);
    println!("  Mean terminal price: ${:.2}", summary.mean);
    println!("  Median terminal price: ${:.2}", summary.median);
    println!("  5th-95th percentile: ${:.2} - ${:.2}", summary.p5, summary.p95);
    println!("  Range: ${:.2} - ${:.2}", summary.min, summary.max);
    if summary.finite_count < forecast.simulation.trials() {
        println!(
            "  {} paths overflowed and were left out of the summary",
            forecast.simulation.trials() - summary.finite_count
        );
    }
}
