//! HTTP endpoint server using Axum

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};
use tracing::{error, info, warn, Level};

use crate::cache::{CacheStats, PriceFetchCache};
use crate::config::{Config, ProviderKind};
use crate::error::FetchError;
use crate::insights::{
    build_insight, detect_ticker, usd_krw_trend, Insight, RatePoint, SUGGESTED_QUESTIONS,
};
use crate::metrics::Metrics;
use crate::models::{Period, Portfolio, PriceBar, PriceQuery};
use crate::services::market_data::{MarketDataProvider, SampleMarketDataProvider};
use crate::services::yahoo::YahooChartProvider;
use crate::ui::{
    push_entry, render_page, DashboardController, HistoryEntry, PageState, QueryState,
    RenderState, Tab, ToolOutcome, ToolRequest, UiEvent, HISTORY_SESSION_KEY,
};

pub const SERVICE_NAME: &str = "stocklens-dashboard";

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub prices: Arc<PriceFetchCache>,
    pub portfolio: Arc<Portfolio>,
    pub dashboard: Arc<DashboardController>,
    pub default_period: Period,
}

impl AppState {
    pub fn new(
        prices: Arc<PriceFetchCache>,
        metrics: Arc<Metrics>,
        portfolio: Portfolio,
        default_period: Period,
    ) -> Self {
        let portfolio = Arc::new(portfolio);
        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            dashboard: Arc::new(DashboardController::new(prices.clone(), portfolio.clone())),
            prices,
            portfolio,
            default_period,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// JSON error body for the `/api` routes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        let status = match &err {
            FetchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            FetchError::EmptyData { .. } => StatusCode::NOT_FOUND,
            FetchError::Network(_) | FetchError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.message, "kind": self.kind })),
        )
            .into_response()
    }
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": SERVICE_NAME
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

async fn load_history(session: &Session) -> Vec<HistoryEntry> {
    match session.get::<Vec<HistoryEntry>>(HISTORY_SESSION_KEY).await {
        Ok(history) => history.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Failed to read session history");
            Vec::new()
        }
    }
}

async fn record_history(session: &Session, entry: HistoryEntry) -> Vec<HistoryEntry> {
    let mut history = load_history(session).await;
    push_entry(&mut history, entry);
    if let Err(e) = session.insert(HISTORY_SESSION_KEY, &history).await {
        warn!(error = %e, "Failed to store session history");
    }
    history
}

/// Records the interaction in the session history and renders the page.
async fn page_response(state: &AppState, session: &Session, page: PageState) -> Response {
    let history = match page.history_entry() {
        Some(entry) => record_history(session, entry).await,
        None => load_history(session).await,
    };
    match render_page(&page, &state.portfolio, &history) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render dashboard");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    tab: Option<String>,
    q: Option<String>,
    suggestion: Option<usize>,
    ticker: Option<String>,
    period: Option<String>,
}

/// Maps query parameters onto UI events. Order matters: the period is
/// applied first, then the question, and an explicit ticker overrides
/// whatever the question detection picked.
fn dashboard_events(params: DashboardParams) -> Result<Vec<UiEvent>, FetchError> {
    let mut events = Vec::new();
    if let Some(period) = params.period.as_deref().filter(|p| !p.trim().is_empty()) {
        events.push(UiEvent::PeriodSelected(period.parse()?));
    }
    if let Some(index) = params.suggestion {
        events.push(UiEvent::SuggestionClicked(index));
    } else if let Some(q) = params.q {
        events.push(UiEvent::QuestionSubmitted(q));
    }
    if let Some(ticker) = params.ticker.filter(|t| !t.trim().is_empty()) {
        events.push(UiEvent::TickerSelected(ticker));
    }
    if events.is_empty() {
        events.push(UiEvent::PageLoaded);
    }
    Ok(events)
}

/// Dashboard page: each request is one interaction.
async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<DashboardParams>,
) -> Response {
    let query = QueryState::new(state.default_period);
    let tab = params.tab.as_deref().map(Tab::from_code).unwrap_or_default();
    let page = if tab != Tab::Ask {
        PageState::new(query, RenderState::Idle).with_tab(tab)
    } else {
        match dashboard_events(params) {
            Ok(events) => state.dashboard.dispatch(query, events).await,
            Err(err) => PageState::new(query, RenderState::Warning(err.to_string())),
        }
    };
    page_response(&state, &session, page).await
}

#[derive(Debug, Deserialize)]
struct TextInput {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CompanyInput {
    #[serde(default)]
    company: String,
}

async fn tool_page(state: &AppState, session: &Session, request: ToolRequest) -> Response {
    let page = state
        .dashboard
        .run_tool(QueryState::new(state.default_period), request);
    page_response(state, session, page).await
}

async fn summary_page(
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<TextInput>,
) -> Response {
    tool_page(&state, &session, ToolRequest::Summarize(input.text)).await
}

async fn report_page(
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<CompanyInput>,
) -> Response {
    tool_page(&state, &session, ToolRequest::Report(input.company)).await
}

async fn disclosure_page(
    State(state): State<AppState>,
    session: Session,
    Form(input): Form<TextInput>,
) -> Response {
    tool_page(&state, &session, ToolRequest::ExplainDisclosure(input.text)).await
}

/// JSON flavour of the writing tools. Successful runs land in the session
/// history like their page counterparts.
async fn tool_json(session: &Session, request: ToolRequest) -> Result<Json<Value>, ApiError> {
    let outcome = request.run();
    if let Some(entry) = outcome.history_entry() {
        record_history(session, entry).await;
    }
    let body = match outcome {
        ToolOutcome::Summary(summary) => json!(summary),
        ToolOutcome::Report(report) => json!(report),
        ToolOutcome::Disclosure(note) => json!(note),
        ToolOutcome::Warning(message) => {
            return Err(ApiError {
                status: StatusCode::BAD_REQUEST,
                kind: "invalid_input",
                message,
            })
        }
    };
    Ok(Json(body))
}

async fn summary_api(session: Session, Json(input): Json<TextInput>) -> Result<Json<Value>, ApiError> {
    tool_json(&session, ToolRequest::Summarize(input.text)).await
}

async fn report_api(session: Session, Json(input): Json<CompanyInput>) -> Result<Json<Value>, ApiError> {
    tool_json(&session, ToolRequest::Report(input.company)).await
}

async fn disclosure_api(session: Session, Json(input): Json<TextInput>) -> Result<Json<Value>, ApiError> {
    tool_json(&session, ToolRequest::ExplainDisclosure(input.text)).await
}

async fn usd_krw() -> Json<Vec<RatePoint>> {
    Json(usd_krw_trend(Utc::now().date_naive()))
}

async fn get_history(session: Session) -> Json<Vec<HistoryEntry>> {
    Json(load_history(&session).await)
}

#[derive(Debug, Deserialize)]
struct PriceParams {
    period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceSeriesResponse {
    pub ticker: String,
    pub period: Period,
    pub bars: Vec<PriceBar>,
    pub returns: Vec<Option<f64>>,
    pub last_close: Option<f64>,
}

/// Price history for a ticker, served from the cache.
async fn get_prices(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<PriceParams>,
) -> Result<Json<PriceSeriesResponse>, ApiError> {
    let period = match params.period.as_deref() {
        Some(p) => p.parse()?,
        None => state.default_period,
    };
    let query = PriceQuery::new(&ticker, period)?;
    let series = state.prices.get(&query).await?;

    Ok(Json(PriceSeriesResponse {
        ticker: series.ticker.clone(),
        period: series.period,
        bars: series.bars.clone(),
        returns: series.returns(),
        last_close: series.last_close(),
    }))
}

async fn list_suggestions() -> Json<Value> {
    let suggestions: Vec<Value> = SUGGESTED_QUESTIONS
        .iter()
        .enumerate()
        .map(|(index, question)| {
            json!({
                "index": index,
                "question": question,
                "ticker": detect_ticker(question),
            })
        })
        .collect();
    Json(json!(suggestions))
}

#[derive(Debug, Deserialize)]
struct InsightParams {
    q: Option<String>,
}

async fn get_insight(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<InsightParams>,
) -> Result<Json<Insight>, ApiError> {
    let question = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| FetchError::InvalidQuery("question must not be empty".to_string()))?;
    let ticker = detect_ticker(&question);
    let insight = build_insight(&question, ticker.as_deref(), &state.portfolio);
    record_history(
        &session,
        HistoryEntry::new(insight.question.as_str(), insight.summary.as_str()),
    )
    .await;
    Ok(Json(insight))
}

async fn get_portfolio(State(state): State<AppState>) -> Json<Value> {
    let holdings: Vec<Value> = state
        .portfolio
        .holdings
        .iter()
        .map(|h| {
            let weight_pct = Some(h.weight_pct()).filter(|w| !w.is_nan());
            json!({
                "symbol": h.symbol,
                "name": h.name,
                "weight_pct": weight_pct,
            })
        })
        .collect();
    Json(json!({ "holdings": holdings }))
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.prices.stats().await)
}

async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.prices.clear().await;
    StatusCode::NO_CONTENT
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/prices/{ticker}", get(get_prices))
        .route("/api/suggestions", get(list_suggestions))
        .route("/api/insight", get(get_insight))
        .route("/api/portfolio", get(get_portfolio))
        .route("/api/cache", get(cache_stats).delete(clear_cache))
        .route("/tools/summary", post(summary_page))
        .route("/tools/report", post(report_page))
        .route("/tools/disclosure", post(disclosure_page))
        .route("/api/summary", post(summary_api))
        .route("/api/report", post(report_api))
        .route("/api/disclosure", post(disclosure_api))
        .route("/api/fx/usdkrw", get(usd_krw))
        .route("/api/history", get(get_history))
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Wires the configured provider, cache and metrics into an [`AppState`].
pub fn build_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(Metrics::new()?);
    let provider: Arc<dyn MarketDataProvider> = match config.provider {
        ProviderKind::Yahoo => Arc::new(YahooChartProvider::new(
            &config.market_data_base_url,
            config.provider_timeout,
        )?),
        ProviderKind::Sample => Arc::new(SampleMarketDataProvider),
    };
    info!(
        provider = provider.id(),
        ttl_seconds = config.cache.ttl.map(|t| t.as_secs()),
        capacity = config.cache.capacity,
        "Price cache configured"
    );

    let prices = Arc::new(PriceFetchCache::new(provider, config.cache).with_metrics(metrics.clone()));
    Ok(AppState::new(
        prices,
        metrics,
        Portfolio::default(),
        config.default_period,
    ))
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = build_state(&config)?;
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!(port = config.port, "HTTP server listening on port {}", config.port);
    info!(
        "Dashboard available at http://0.0.0.0:{}/",
        config.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
