//! Unit tests for the canned writing tools and the exchange rate sample

use chrono::NaiveDate;
use stocklens::insights::tools::{
    explain_disclosure, generate_report, summarize_long_text, ToolError,
};
use stocklens::insights::usd_krw_trend;

#[test]
fn summary_counts_characters_not_bytes() {
    let summary = summarize_long_text("  삼성전자 실적 발표  ").unwrap();
    assert_eq!(summary.characters, 10);
    assert!(!summary.summary.is_empty());
}

#[test]
fn blank_inputs_are_rejected() {
    assert_eq!(summarize_long_text("\n\t "), Err(ToolError::EmptyText));
    assert_eq!(generate_report(" "), Err(ToolError::EmptyCompany));
    assert_eq!(explain_disclosure(""), Err(ToolError::EmptyDisclosure));
}

#[test]
fn report_names_company_and_detects_ticker() {
    let report = generate_report(" 삼성전자 ").unwrap();
    assert_eq!(report.company, "삼성전자");
    assert_eq!(report.ticker.as_deref(), Some("005930.KS"));
    assert!(report.report.starts_with("삼성전자 investment report sample."));

    let unknown = generate_report("Acme Holdings").unwrap();
    assert!(unknown.ticker.is_none());
}

#[test]
fn disclosure_has_translation_and_commentary() {
    let note = explain_disclosure("The board approved a share buyback.").unwrap();
    assert_eq!(note.translation, "Sample translation of the disclosure.");
    assert!(note.commentary.contains("investor"));
}

#[test]
fn usd_krw_trend_is_one_week_ending_on_the_day() {
    let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
    let trend = usd_krw_trend(end);

    assert_eq!(trend.len(), 7);
    assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2024, 2, 25).unwrap());
    assert_eq!(trend[6].date, end);
    assert_eq!(trend[0].rate, 1310.0);
    assert_eq!(trend[6].rate, 1328.0);
    assert!(trend.windows(2).all(|w| w[0].date < w[1].date));
}
