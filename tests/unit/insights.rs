//! Unit tests for ticker detection and canned insights

use stocklens::insights::{build_insight, detect_ticker, KNOWN_COMPANIES, SUGGESTED_QUESTIONS};
use stocklens::models::{Holding, Portfolio};

#[test]
fn detects_korean_company_name() {
    assert_eq!(detect_ticker("테슬라 전망은?").as_deref(), Some("TSLA"));
}

#[test]
fn detects_english_company_name() {
    assert_eq!(detect_ticker("Apple outlook").as_deref(), Some("AAPL"));
    assert_eq!(detect_ticker("is NVIDIA overheated").as_deref(), Some("NVDA"));
}

#[test]
fn names_inside_other_words_are_ignored() {
    assert_eq!(detect_ticker("pineapple prices are up"), None);
    assert_eq!(detect_ticker("메타버스 관련주는?"), None);
    assert_eq!(detect_ticker("kakaotalk usage"), None);
}

#[test]
fn korean_particles_after_names_still_match() {
    assert_eq!(detect_ticker("삼성전자의 배당은?").as_deref(), Some("005930.KS"));
    assert_eq!(detect_ticker("메타는 어때?").as_deref(), Some("META"));
    assert_eq!(detect_ticker("Apple's margins").as_deref(), Some("AAPL"));
}

#[test]
fn longest_name_wins() {
    assert_eq!(
        detect_ticker("Samsung Electronics ESG risk").as_deref(),
        Some("005930.KS")
    );
}

#[test]
fn falls_back_to_uppercase_symbol() {
    assert_eq!(detect_ticker("What about MSFT today?").as_deref(), Some("MSFT"));
    assert_eq!(detect_ticker("Thoughts on ESG and IBM?").as_deref(), Some("IBM"));
}

#[test]
fn no_ticker_in_generic_question() {
    assert_eq!(detect_ticker("What is the US rate outlook?"), None);
    assert_eq!(detect_ticker(""), None);
}

#[test]
fn every_suggestion_mentions_a_known_company() {
    for question in SUGGESTED_QUESTIONS {
        let ticker = detect_ticker(question).unwrap_or_else(|| panic!("no ticker in {}", question));
        assert!(KNOWN_COMPANIES.iter().any(|c| c.ticker == ticker));
    }
}

#[test]
fn insight_includes_portfolio_weight_when_held() {
    let portfolio = Portfolio::new(vec![Holding::new("TSLA", "Tesla", "25")]);
    let insight = build_insight("  Tesla outlook ", Some("TSLA"), &portfolio);

    assert_eq!(insight.question, "Tesla outlook");
    assert!(insight.summary.contains("Tesla outlook"));
    assert_eq!(insight.news.len(), 3);
    assert_eq!(
        insight.portfolio_note.as_deref(),
        Some("TSLA makes up 25.0% of your portfolio.")
    );
}

#[test]
fn insight_omits_portfolio_note_for_unknown_weight() {
    let portfolio = Portfolio::new(vec![Holding::new("TSLA", "Tesla", "n/a")]);
    let insight = build_insight("Tesla outlook", Some("TSLA"), &portfolio);
    assert!(insight.portfolio_note.is_none());

    let insight = build_insight("Rates?", None, &portfolio);
    assert!(insight.ticker.is_none());
    assert!(insight.portfolio_note.is_none());
}
