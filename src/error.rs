//! Error taxonomy for price lookups.

use thiserror::Error;

/// Errors surfaced by [`PriceFetchCache::get`](crate::cache::PriceFetchCache::get)
/// and the market data providers behind it.
///
/// None of these are ever stored in the cache: a failed lookup is eligible
/// for an immediate retry on the next call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Malformed ticker or unsupported period. Raised before any network call.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The provider could not be reached, timed out, or answered with a
    /// server-side failure.
    #[error("market data provider unreachable: {0}")]
    Network(String),

    /// The request was valid but the provider returned no rows, which is
    /// what an unknown ticker looks like.
    #[error("no price data for {ticker} over {period}")]
    EmptyData { ticker: String, period: String },

    /// The provider answered but the payload could not be decoded.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidQuery(_) => "invalid_query",
            FetchError::Network(_) => "network",
            FetchError::EmptyData { .. } => "empty_data",
            FetchError::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
