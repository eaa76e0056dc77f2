//! External market data sources.

pub mod market_data;
pub mod yahoo;

pub use market_data::{MarketDataProvider, SampleMarketDataProvider};
pub use yahoo::YahooChartProvider;
