//! Ticker detection and the canned insight text shown next to the chart.

pub mod tools;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::Portfolio;

pub struct Company {
    pub ticker: &'static str,
    pub names: &'static [&'static str],
}

/// Company names recognised in free-text questions, Korean and English.
pub const KNOWN_COMPANIES: &[Company] = &[
    Company { ticker: "TSLA", names: &["테슬라", "tesla"] },
    Company { ticker: "AAPL", names: &["애플", "apple"] },
    Company { ticker: "MSFT", names: &["마이크로소프트", "microsoft"] },
    Company { ticker: "NVDA", names: &["엔비디아", "nvidia"] },
    Company { ticker: "AMZN", names: &["아마존", "amazon"] },
    Company { ticker: "GOOGL", names: &["구글", "알파벳", "google", "alphabet"] },
    Company { ticker: "META", names: &["메타", "facebook"] },
    Company { ticker: "005930.KS", names: &["삼성전자", "samsung electronics", "samsung"] },
    Company { ticker: "035720.KS", names: &["카카오", "kakao"] },
    Company { ticker: "035420.KS", names: &["네이버", "naver"] },
];

/// Questions rendered as one-click buttons on the dashboard.
pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "What is the outlook for Tesla?",
    "How has Apple traded this year?",
    "삼성전자 ESG 리스크는?",
    "Is Nvidia overheated?",
    "카카오 주가 전망은?",
    "How do US rate expectations affect Microsoft?",
];

// Uppercase words that look like tickers but almost never are.
const TICKER_STOPWORDS: &[&str] = &[
    "A", "I", "AI", "CEO", "ESG", "ETF", "EPS", "GDP", "IPO", "IS", "IT", "OK", "THE", "US",
    "USA", "USD", "KRW", "FX",
];

// Korean particles that may follow a company name directly ("삼성전자의").
const NAME_SUFFIXES: &[char] = &[
    '은', '는', '이', '가', '을', '를', '의', '에', '와', '과', '도', '로', '으', '만',
];

fn is_hangul(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// True when `name` occurs in `text` as a whole word. A Hangul syllable may
/// only follow the name if it is a particle, so "메타버스" does not mention
/// 메타 and "pineapple" does not mention apple.
fn mentions(text: &str, name: &str) -> bool {
    text.match_indices(name).any(|(start, matched)| {
        let before = text[..start].chars().next_back();
        let after = text[start + matched.len()..].chars().next();
        let starts_word = before.map_or(true, |c| !c.is_alphanumeric());
        let ends_word = match after {
            None => true,
            Some(c) if is_hangul(c) => NAME_SUFFIXES.contains(&c),
            Some(c) => !c.is_alphanumeric(),
        };
        starts_word && ends_word
    })
}

/// Finds the ticker a question is about.
///
/// Company names win over bare symbols; among names, the longest match wins
/// so "Samsung Electronics" is not shadowed by a shorter alias.
pub fn detect_ticker(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let by_name = KNOWN_COMPANIES
        .iter()
        .flat_map(|c| c.names.iter().map(move |n| (c.ticker, *n)))
        .filter(|(_, name)| mentions(&lowered, &name.to_lowercase()))
        .max_by_key(|(_, name)| name.chars().count())
        .map(|(ticker, _)| ticker.to_string());
    if by_name.is_some() {
        return by_name;
    }

    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '-'))
        .map(|token| token.trim_matches(|c: char| c == '.' || c == '-'))
        .find(|token| {
            (1..=5).contains(&token.len())
                && token.chars().all(|c| c.is_ascii_uppercase())
                && !TICKER_STOPWORDS.contains(&token)
        })
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticle {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub question: String,
    pub ticker: Option<String>,
    pub summary: String,
    pub esg: String,
    pub news: Vec<NewsArticle>,
    pub market_impact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_note: Option<String>,
}

/// One daily USD/KRW reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub rate: f64,
}

const USD_KRW_SAMPLE: [f64; 7] = [1310.0, 1320.0, 1315.0, 1325.0, 1330.0, 1322.0, 1328.0];

/// Sample week of USD/KRW rates ending on `end`, oldest first.
pub fn usd_krw_trend(end: NaiveDate) -> Vec<RatePoint> {
    let days = USD_KRW_SAMPLE.len() as i64;
    USD_KRW_SAMPLE
        .iter()
        .enumerate()
        .map(|(i, rate)| RatePoint {
            date: end - Duration::days(days - 1 - i as i64),
            rate: *rate,
        })
        .collect()
}

/// Sample headlines shown when no live news source is configured.
pub fn fallback_news() -> Vec<NewsArticle> {
    (1..=3)
        .map(|i| NewsArticle {
            title: format!("Market news {}", i),
            summary: format!("Summary of market news item {}.", i),
        })
        .collect()
}

/// Assembles the static sample insight for a question.
pub fn build_insight(question: &str, ticker: Option<&str>, portfolio: &Portfolio) -> Insight {
    let question = question.trim();
    let summary = match ticker {
        Some(t) => format!(
            "Sample answer for '{}'. A combined view of recent market conditions for {} would appear here.",
            question, t
        ),
        None => format!(
            "Sample answer for '{}'. A combined view of recent market conditions would appear here.",
            question
        ),
    };

    let portfolio_note = ticker.and_then(|t| {
        let weight = portfolio.weight_of(t);
        if weight.is_nan() {
            None
        } else {
            Some(format!("{} makes up {:.1}% of your portfolio.", t, weight))
        }
    });

    Insight {
        question: question.to_string(),
        ticker: ticker.map(str::to_string),
        summary,
        esg: "The company is strengthening its environmental programme, though supply chain \
              transparency is rated as needing further improvement."
            .to_string(),
        news: fallback_news(),
        market_impact: "Example analysis of how interest rate and exchange rate moves could \
                        affect the portfolio."
            .to_string(),
        portfolio_note,
    }
}
