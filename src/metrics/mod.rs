//! Prometheus metrics for the HTTP layer and the price cache.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    pub price_cache_hits_total: IntCounter,
    pub price_cache_misses_total: IntCounter,
    pub price_fetch_errors_total: IntCounterVec,
    pub provider_fetch_duration_seconds: Histogram,
}

impl Metrics {
    /// Builds a fresh registry. Each instance is independent, so tests can
    /// create as many as they like without global collisions.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let price_cache_hits_total = IntCounter::new(
            "price_cache_hits_total",
            "Price lookups answered from the cache",
        )?;
        let price_cache_misses_total = IntCounter::new(
            "price_cache_misses_total",
            "Price lookups that went to the provider",
        )?;
        let price_fetch_errors_total = IntCounterVec::new(
            Opts::new("price_fetch_errors_total", "Failed provider fetches by kind"),
            &["kind"],
        )?;
        let provider_fetch_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "provider_fetch_duration_seconds",
            "Market data provider fetch latency in seconds",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(price_cache_hits_total.clone()))?;
        registry.register(Box::new(price_cache_misses_total.clone()))?;
        registry.register(Box::new(price_fetch_errors_total.clone()))?;
        registry.register(Box::new(provider_fetch_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            price_cache_hits_total,
            price_cache_misses_total,
            price_fetch_errors_total,
            provider_fetch_duration_seconds,
        })
    }

    /// Text exposition format for the `/metrics` endpoint.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
