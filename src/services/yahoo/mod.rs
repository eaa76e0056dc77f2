//! Yahoo Finance chart provider.
//!
//! Fetches daily bars from `/v8/finance/chart/{ticker}?range={period}`.
//! Unknown symbols come back as HTTP 404 with a `chart.error` payload; those
//! are reported as an empty series, not a transport failure.

pub mod models;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;
use crate::models::{PriceBar, PriceQuery, PriceSeries};
use crate::services::market_data::MarketDataProvider;

use models::{ChartEnvelope, ChartResult};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const INTERVAL: &str = "1d";

pub struct YahooChartProvider {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooChartProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;
        Self::with_client(base_url, client)
    }

    /// Use a caller-supplied client, e.g. one pointed at a mock server.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidQuery(format!("invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self { base_url, client })
    }

    pub fn chart_url(&self, query: &PriceQuery) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidQuery(format!("base URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", query.ticker()]);
        url.query_pairs_mut()
            .append_pair("range", query.period().code())
            .append_pair("interval", INTERVAL)
            .append_pair("includePrePost", "false");
        Ok(url)
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartProvider {
    fn id(&self) -> &'static str {
        "YAHOO"
    }

    async fn fetch_history(&self, query: &PriceQuery) -> Result<PriceSeries, FetchError> {
        let url = self.chart_url(query)?;
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        debug!(
            ticker = %query.ticker(),
            period = %query.period(),
            status = %status,
            elapsed_ms = started.elapsed().as_millis(),
            "Yahoo chart response"
        );

        if status == StatusCode::NOT_FOUND {
            return Ok(PriceSeries::new(query, Vec::new()));
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "provider returned HTTP {} for {}",
                status, query
            )));
        }

        let body = response.text().await?;
        let envelope: ChartEnvelope = serde_json::from_str(&body)
            .map_err(|e| FetchError::MalformedResponse(format!("chart payload: {}", e)))?;

        if let Some(err) = envelope.chart.error {
            warn!(
                ticker = %query.ticker(),
                code = %err.code,
                description = err.description.as_deref().unwrap_or(""),
                "Yahoo chart error payload"
            );
            return Ok(PriceSeries::new(query, Vec::new()));
        }

        let bars = envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(bars_from_result)
            .unwrap_or_default();

        Ok(PriceSeries::new(query, bars))
    }
}

/// Zips the column arrays into bars, skipping rows missing any OHLC value.
fn bars_from_result(result: ChartResult) -> Vec<PriceBar> {
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let cell = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let timestamp: DateTime<Utc> = DateTime::from_timestamp(ts, 0)?;
            Some(PriceBar::new(
                timestamp,
                cell(&quote.open, i)?,
                cell(&quote.high, i)?,
                cell(&quote.low, i)?,
                cell(&quote.close, i)?,
                cell(&quote.volume, i).unwrap_or(0.0),
            ))
        })
        .collect()
}
