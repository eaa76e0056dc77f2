//! Market data provider interface and the offline sample provider.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::error::FetchError;
use crate::insights::KNOWN_COMPANIES;
use crate::models::{Period, PriceBar, PriceQuery, PriceSeries};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Stable identifier used in logs.
    fn id(&self) -> &'static str;

    /// Fetch the full history for a query. Implementations return an empty
    /// series rather than an error when the provider simply has no rows;
    /// the cache turns that into [`FetchError::EmptyData`].
    async fn fetch_history(&self, query: &PriceQuery) -> Result<PriceSeries, FetchError>;
}

/// Deterministic offline provider for demos without network access.
///
/// Serves a synthetic daily series for every ticker in the known-company
/// table and nothing for anything else.
pub struct SampleMarketDataProvider;

impl SampleMarketDataProvider {
    fn bar_count(period: Period) -> usize {
        match period {
            Period::OneDay => 1,
            Period::FiveDays => 5,
            Period::OneMonth => 21,
            Period::ThreeMonths => 63,
            Period::SixMonths | Period::YearToDate => 126,
            Period::OneYear => 252,
            Period::TwoYears | Period::FiveYears | Period::TenYears | Period::Max => 504,
        }
    }

    fn base_price(ticker: &str) -> f64 {
        let seed: u32 = ticker.bytes().map(u32::from).sum();
        50.0 + f64::from(seed % 400)
    }
}

#[async_trait]
impl MarketDataProvider for SampleMarketDataProvider {
    fn id(&self) -> &'static str {
        "SAMPLE"
    }

    async fn fetch_history(&self, query: &PriceQuery) -> Result<PriceSeries, FetchError> {
        if !KNOWN_COMPANIES.iter().any(|c| c.ticker == query.ticker()) {
            return Ok(PriceSeries::new(query, Vec::new()));
        }

        let count = Self::bar_count(query.period());
        let base = Self::base_price(query.ticker());
        let end = Utc
            .with_ymd_and_hms(2024, 6, 28, 20, 0, 0)
            .single()
            .ok_or_else(|| FetchError::MalformedResponse("invalid sample anchor date".to_string()))?;

        let bars = (0..count)
            .map(|i| {
                let step = i as f64;
                let close = base * (1.0 + 0.002 * step) + (step * 0.7).sin() * base * 0.01;
                let open = close - (step * 0.3).cos() * base * 0.004;
                let high = open.max(close) * 1.006;
                let low = open.min(close) * 0.994;
                let timestamp = end - Duration::days((count - 1 - i) as i64);
                PriceBar::new(timestamp, open, high, low, close, 1_000_000.0 + step * 1_000.0)
            })
            .collect();

        Ok(PriceSeries::new(query, bars))
    }
}
