//! Stock price dashboard with canned investment insights.
//!
//! The interesting part is [`cache::PriceFetchCache`], which sits between
//! the UI host and the market data provider and guarantees one provider
//! fetch per `(ticker, period)` per validity window.

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod insights;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod ui;

pub use cache::{CachePolicy, PriceFetchCache};
pub use error::FetchError;
pub use models::{Period, PriceQuery, PriceSeries};
