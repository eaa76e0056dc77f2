use serde::{Deserialize, Serialize};

/// One row of the user's holdings table. The weight is kept as the text the
/// user typed; it is parsed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub weight: String,
}

impl Holding {
    pub fn new(symbol: &str, name: &str, weight: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            weight: weight.to_string(),
        }
    }

    /// Weight in percent, `NaN` when the text is not a number.
    pub fn weight_pct(&self) -> f64 {
        self.weight.trim().parse::<f64>().unwrap_or(f64::NAN)
    }

    fn matches(&self, ticker: &str) -> bool {
        let ticker = ticker.trim();
        self.symbol.eq_ignore_ascii_case(ticker) || self.name == ticker
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn weight_of(&self, ticker: &str) -> f64 {
        extract_ticker_weight(&self.holdings, ticker)
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Self::new(vec![
            Holding::new("005930.KS", "삼성전자", "50"),
            Holding::new("035720.KS", "카카오", "50"),
        ])
    }
}

/// Weight in percent of the first holding matching `ticker` by symbol or name.
///
/// Returns `NaN` when nothing matches or the weight text is non-numeric, so
/// callers can treat "unknown" uniformly with `f64::is_nan`.
pub fn extract_ticker_weight(holdings: &[Holding], ticker: &str) -> f64 {
    holdings
        .iter()
        .find(|h| h.matches(ticker))
        .map(Holding::weight_pct)
        .unwrap_or(f64::NAN)
}
