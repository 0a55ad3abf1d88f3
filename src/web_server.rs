//! Web server for the equity dashboard
//!
//! Serves the dashboard page and a JSON API over the analysis pipeline.
//! The full history of each ticker is memoized and narrowed per request;
//! statistics, buckets and forecasts always run on the full history. Seeded
//! forecasts are memoized per request, so flipping between tickers does not
//! re-read files.

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, ResponseError};
use anyhow::Context;
use clap::Parser;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use equity_montecarlo::config::{Config, MAX_SIMULATION_DAYS};
use equity_montecarlo::history::{normalize_ticker, CsvDirectoryProvider, HistoryProvider, PriceHistory};
use equity_montecarlo::logging::init_logging;
use equity_montecarlo::pipeline::{analyze, forecast, volume_profile, AnalysisRequest, Forecast};
use equity_montecarlo::{AnalysisError, Period};

/// Failures surfaced to the dashboard as JSON
#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("bad query: {0}")]
    BadQuery(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Analysis(AnalysisError::DataUnavailable { .. }) => StatusCode::NOT_FOUND,
            ApiError::Analysis(AnalysisError::InvalidPrice { .. })
            | ApiError::Analysis(AnalysisError::InsufficientData { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Analysis(AnalysisError::InvalidParameter { .. }) | ApiError::BadQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let kind = match self {
            ApiError::Analysis(e) => e.kind(),
            ApiError::BadQuery(_) => "BadQuery",
            ApiError::Internal(_) => "Internal",
        };
        HttpResponse::build(status).json(ErrorBody {
            error: kind,
            message: self.to_string(),
        })
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ForecastKey {
    ticker: String,
    days: usize,
    trials: usize,
    seed: u64,
}

struct AppState {
    config: Config,
    provider: Arc<dyn HistoryProvider>,
    /// Full (`max`) history per ticker
    histories: Cache<String, Arc<PriceHistory>>,
    forecasts: Cache<ForecastKey, Arc<Forecast>>,
}

impl AppState {
    fn new(config: Config, provider: Arc<dyn HistoryProvider>) -> Self {
        let capacity = config.server.cache_capacity;
        Self {
            config,
            provider,
            histories: Cache::new(capacity),
            forecasts: Cache::new(capacity),
        }
    }

    /// Fill the blanks of a query from the configured defaults
    fn request_from(&self, query: &AnalysisQuery) -> Result<AnalysisRequest, ApiError> {
        let mut request = AnalysisRequest::from_config(&self.config);
        if let Some(ticker) = query.ticker.as_deref().filter(|t| !t.trim().is_empty()) {
            request.ticker = ticker.to_string();
        }
        request.ticker = normalize_ticker(&request.ticker)?;
        if let Some(period) = query.period.as_deref().filter(|p| !p.trim().is_empty()) {
            request.period = period.parse()?;
        }
        if let Some(days) = query.days {
            if days > MAX_SIMULATION_DAYS {
                return Err(AnalysisError::invalid_parameter(
                    "days",
                    format!("at most {} days are allowed, got {}", MAX_SIMULATION_DAYS, days),
                )
                .into());
            }
            request.days = days;
        }
        if let Some(trials) = query.trials {
            request.trials = trials;
        }
        if query.seed.is_some() {
            request.seed = query.seed;
        }
        if let Some(buckets) = query.buckets {
            request.buckets = buckets;
        }
        request.check_limits(self.config.simulation.max_trials)?;
        Ok(request)
    }

    async fn history(&self, ticker: &str) -> Result<Arc<PriceHistory>, ApiError> {
        if let Some(history) = self.histories.get(ticker) {
            debug!(ticker, "history cache hit");
            return Ok(history);
        }

        let provider = Arc::clone(&self.provider);
        let key = ticker.to_string();
        let history = web::block(move || PriceHistory::fetch(provider.as_ref(), &key, Period::Max)).await??;

        info!(
            ticker = %history.ticker,
            bars = history.series.len(),
            dropped = history.dropped_rows,
            "history loaded"
        );
        let history = Arc::new(history);
        self.histories.insert(ticker.to_string(), Arc::clone(&history));
        Ok(history)
    }
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisQuery {
    ticker: Option<String>,
    period: Option<String>,
    days: Option<usize>,
    trials: Option<usize>,
    seed: Option<u64>,
    buckets: Option<usize>,
}

async fn index() -> HttpResponse {
    let html = include_str!("../ui/index.html");
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

async fn get_history(state: web::Data<AppState>, query: web::Query<AnalysisQuery>) -> Result<HttpResponse, ApiError> {
    let request = state.request_from(&query)?;
    let history = state.history(&request.ticker).await?;
    Ok(HttpResponse::Ok().json(history.with_period(request.period)))
}

async fn get_buckets(state: web::Data<AppState>, query: web::Query<AnalysisQuery>) -> Result<HttpResponse, ApiError> {
    let request = state.request_from(&query)?;
    let history = state.history(&request.ticker).await?;
    let buckets = web::block(move || volume_profile(&history, request.buckets)).await??;
    Ok(HttpResponse::Ok().json(buckets))
}

async fn get_forecast(state: web::Data<AppState>, query: web::Query<AnalysisQuery>) -> Result<HttpResponse, ApiError> {
    let request = state.request_from(&query)?;
    let key = request.seed.map(|seed| ForecastKey {
        ticker: request.ticker.clone(),
        days: request.days,
        trials: request.trials,
        seed,
    });
    if let Some(cached) = key.as_ref().and_then(|k| state.forecasts.get(k)) {
        debug!(ticker = %request.ticker, "forecast cache hit");
        return Ok(HttpResponse::Ok().json(cached.as_ref()));
    }

    let history = state.history(&request.ticker).await?;
    let (days, trials, seed) = (request.days, request.trials, request.seed);
    let result = Arc::new(web::block(move || forecast(&history, days, trials, seed)).await??);
    // Unseeded runs are random on purpose and stay out of the cache
    if let Some(key) = key {
        state.forecasts.insert(key, Arc::clone(&result));
    }
    Ok(HttpResponse::Ok().json(result.as_ref()))
}

async fn get_analysis(state: web::Data<AppState>, query: web::Query<AnalysisQuery>) -> Result<HttpResponse, ApiError> {
    let request = state.request_from(&query)?;
    let history = state.history(&request.ticker).await?;
    let report = web::block(move || analyze(&history, &request)).await??;
    Ok(HttpResponse::Ok().json(report))
}

/// Register routes; `ui_directory` is served under `/ui`
fn routes(ui_directory: PathBuf) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| ApiError::BadQuery(err.to_string()).into()),
        )
        .route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .service(
            web::scope("/api")
                .route("/history", web::get().to(get_history))
                .route("/buckets", web::get().to(get_buckets))
                .route("/forecast", web::get().to(get_forecast))
                .route("/analysis", web::get().to(get_analysis)),
        )
        .service(actix_files::Files::new("/ui", ui_directory));
    }
}

#[derive(Debug, Parser)]
#[command(name = "web-server", about = "Equity Monte Carlo dashboard server")]
struct Args {
    /// YAML configuration file
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    init_logging(&config.logging)?;

    let provider: Arc<dyn HistoryProvider> = Arc::new(CsvDirectoryProvider::new(&config.data.directory));
    let bind = (config.server.host.clone(), config.server.port);
    let ui_directory = config.server.ui_directory.clone();
    info!(
        host = %bind.0,
        port = bind.1,
        data = %config.data.directory.display(),
        "dashboard server starting"
    );

    let state = web::Data::new(AppState::new(config, provider));
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes(ui_directory.clone()))
    })
    .bind(bind)?
    .run()
    .await?;
    Ok(())
}
