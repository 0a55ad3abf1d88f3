//! End-to-end runs of the analysis pipeline

use equity_montecarlo::history::{CsvDirectoryProvider, InMemoryProvider, RawBar};
use equity_montecarlo::pipeline::{analyze, forecast, volume_profile, AnalysisRequest};
use equity_montecarlo::{AnalysisError, Period, PriceHistory};

fn provider() -> InMemoryProvider {
    InMemoryProvider::new()
        .with_rows(
            "ACME",
            vec![
                RawBar::close_only("2024-03-04", 100.0, 10.0),
                RawBar::close_only("2024-03-05", 102.0, 30.0),
                RawBar::close_only("2024-03-06", 101.0, 20.0),
                RawBar::close_only("2024-03-07", 105.0, 40.0),
            ],
        )
        .with_rows("ONE", vec![RawBar::close_only("2024-03-04", 100.0, 10.0)])
}

fn request(buckets: usize, seed: Option<u64>) -> AnalysisRequest {
    AnalysisRequest {
        ticker: "ACME".to_string(),
        period: Period::Max,
        days: 30,
        trials: 100,
        seed,
        buckets,
    }
}

#[test]
fn test_four_closes_end_to_end() {
    let history = PriceHistory::fetch(&provider(), "acme", Period::Max).unwrap();
    let report = analyze(&history, &request(3, Some(42))).unwrap();

    let simple: Vec<f64> = report.returns.iter().map(|r| r.simple_return).collect();
    let expected = [0.02, 101.0 / 102.0 - 1.0, 105.0 / 101.0 - 1.0];
    assert_eq!(simple.len(), 3);
    for (got, want) in simple.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12);
    }

    let logs: Vec<f64> = expected.iter().map(|r| (1.0 + r).ln()).collect();
    let mean = logs.iter().sum::<f64>() / 3.0;
    let var = logs.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / 2.0;
    assert!((report.volatility.drift - (mean - 0.5 * var)).abs() < 1e-12);
    assert!((report.volatility.stdev - var.sqrt()).abs() < 1e-12);

    // volumes 30, 20, 40 put one day in each bucket, lowest volume first
    let means: Vec<f64> = report.buckets.iter().map(|b| b.mean_return).collect();
    assert_eq!(report.buckets.iter().map(|b| b.count).collect::<Vec<_>>(), vec![1, 1, 1]);
    assert!((means[0] - expected[1]).abs() < 1e-12);
    assert!((means[1] - expected[0]).abs() < 1e-12);
    assert!((means[2] - expected[2]).abs() < 1e-12);

    let sim = &report.forecast.simulation;
    assert_eq!(sim.paths.len(), 100);
    assert!(sim.paths.iter().all(|p| p.len() == 31 && p[0] == 105.0));
    assert_eq!(report.forecast.horizon.len(), 30);
}

#[test]
fn test_same_seed_same_paths() {
    let history = PriceHistory::fetch(&provider(), "ACME", Period::Max).unwrap();
    let a = forecast(&history, 30, 100, Some(7)).unwrap();
    let b = forecast(&history, 30, 100, Some(7)).unwrap();
    let c = forecast(&history, 30, 100, Some(8)).unwrap();
    assert_eq!(a.simulation, b.simulation);
    assert_ne!(a.simulation, c.simulation);
}

#[test]
fn test_failures_are_typed() {
    let err = PriceHistory::fetch(&provider(), "MISSING", Period::Max).unwrap_err();
    assert!(matches!(err, AnalysisError::DataUnavailable { .. }));

    let one = PriceHistory::fetch(&provider(), "ONE", Period::Max).unwrap();
    let err = analyze(&one, &request(3, Some(1))).unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { .. }));

    let history = PriceHistory::fetch(&provider(), "ACME", Period::Max).unwrap();
    let err = volume_profile(&history, 20).unwrap_err();
    assert_eq!(err, AnalysisError::InsufficientData { required: 20, actual: 3 });
}

#[test]
fn test_sample_data_one_year() {
    let provider = CsvDirectoryProvider::new("data");
    let history = PriceHistory::fetch(&provider, "demo", Period::Max).unwrap();
    assert_eq!(history.dropped_rows, 0);

    let mut req = request(20, Some(1));
    req.ticker = "DEMO".to_string();
    req.period = Period::OneYear;
    let report = analyze(&history, &req).unwrap();

    let first = report.prices.first().unwrap().date;
    let last = report.prices.last().unwrap().date;
    assert!(last - first <= chrono::Duration::days(366));
    assert_eq!(report.prices, history.with_period(Period::OneYear).series);
    assert!(report.prices.len() < history.series.len());
    assert_eq!(report.returns.len(), history.series.len() - 1);
    assert_eq!(report.buckets.len(), 20);
    assert_eq!(report.buckets.iter().map(|b| b.count).sum::<usize>(), report.returns.len());
    assert!(report.forecast.summary.median > 0.0);
}
