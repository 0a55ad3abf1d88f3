//! Equity Monte Carlo Dashboard
//!
//! Historical prices → return statistics → volume buckets and Monte Carlo
//! price paths, served as JSON to a small charting dashboard.
//!
//! Binaries:
//!   cargo run --bin equity-sim -- --ticker AAPL --days 30 --trials 1000
//!   cargo run --bin web-server -- config/dashboard.yaml

pub mod buckets;
pub mod calendar;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod returns;
pub mod simulation;

pub use buckets::{bucketize, VolumeBucket};
pub use calendar::Period;
pub use error::{AnalysisError, AnalysisResult};
pub use history::{Bar, PriceHistory, PriceSeries};
pub use returns::{compute, ReturnSample, VolatilityModel};
pub use simulation::{simulate, NormalSource, RngNormals, SimulationResult};
