use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

const MAX_TICKER_LEN: usize = 15;

/// Lookback window requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    /// Range code understood by the provider.
    pub fn code(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::OneDay => "1 day",
            Period::FiveDays => "5 days",
            Period::OneMonth => "1 month",
            Period::ThreeMonths => "3 months",
            Period::SixMonths => "6 months",
            Period::OneYear => "1 year",
            Period::TwoYears => "2 years",
            Period::FiveYears => "5 years",
            Period::TenYears => "10 years",
            Period::YearToDate => "year to date",
            Period::Max => "all available history",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::SixMonths
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Period {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.code() == code)
            .ok_or_else(|| FetchError::InvalidQuery(format!("unsupported period '{}'", s.trim())))
    }
}

/// Cache key for a price lookup. Only constructible through validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PriceQuery {
    ticker: String,
    period: Period,
}

impl PriceQuery {
    pub fn new(ticker: &str, period: Period) -> Result<Self, FetchError> {
        Ok(Self {
            ticker: normalize_ticker(ticker)?,
            period,
        })
    }

    /// Builds a query from raw user input, validating both halves.
    pub fn parse(ticker: &str, period: &str) -> Result<Self, FetchError> {
        Self::new(ticker, period.parse()?)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn period(&self) -> Period {
        self.period
    }
}

impl fmt::Display for PriceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ticker, self.period)
    }
}

/// Trims and uppercases a ticker, rejecting anything that cannot be a symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, FetchError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(FetchError::InvalidQuery("ticker must not be empty".to_string()));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(FetchError::InvalidQuery(format!(
            "ticker '{}' is longer than {} characters",
            ticker, MAX_TICKER_LEN
        )));
    }
    if let Some(bad) = ticker
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
    {
        return Err(FetchError::InvalidQuery(format!(
            "ticker '{}' contains invalid character '{}'",
            raw.trim(),
            bad
        )));
    }
    Ok(ticker)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Time-ordered price history for one [`PriceQuery`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub period: Period,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts the bars by timestamp so callers never see provider ordering quirks.
    pub fn new(query: &PriceQuery, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self {
            ticker: query.ticker().to_string(),
            period: query.period(),
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Close-to-close percentage change. The first bar has no return, nor
    /// does any bar whose previous close is zero or not finite.
    pub fn returns(&self) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(self.bars.len());
        for (i, bar) in self.bars.iter().enumerate() {
            if i == 0 {
                out.push(None);
                continue;
            }
            let prev = self.bars[i - 1].close;
            if prev == 0.0 || !prev.is_finite() {
                out.push(None);
            } else {
                out.push(Some((bar.close - prev) / prev));
            }
        }
        out
    }

    /// Change from the first close to the last, as a fraction.
    pub fn total_return(&self) -> Option<f64> {
        let first = self.bars.first()?.close;
        let last = self.bars.last()?.close;
        if first == 0.0 || !first.is_finite() {
            return None;
        }
        Some((last - first) / first)
    }
}
