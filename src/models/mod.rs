//! Shared data models for price lookups and the holdings table.

pub mod portfolio;
pub mod price;

pub use portfolio::{extract_ticker_weight, Holding, Portfolio};
pub use price::{normalize_ticker, Period, PriceBar, PriceQuery, PriceSeries};
