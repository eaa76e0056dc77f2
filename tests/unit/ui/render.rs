//! Unit tests for dashboard HTML rendering

use std::sync::Arc;

use chrono::NaiveDate;
use stocklens::error::FetchError;
use stocklens::insights::tools::{generate_report, DEFAULT_REPORT_COMPANY};
use stocklens::insights::{build_insight, usd_krw_trend, SUGGESTED_QUESTIONS};
use stocklens::models::{Holding, Period, Portfolio, PriceQuery, PriceSeries};
use stocklens::ui::{
    fx_chart_svg, portfolio_pie_svg, portfolio_slices, price_chart_svg, render_page,
    render_page_on, HistoryEntry, PageState, QueryState, RenderState, Tab, ToolOutcome,
    ToolRequest,
};

use crate::test_utils::sample_bars;

fn series(bars: usize) -> PriceSeries {
    let q = PriceQuery::new("AAPL", Period::OneMonth).unwrap();
    PriceSeries::new(&q, sample_bars(bars))
}

fn render(page: &PageState) -> String {
    render_page(page, &Portfolio::default(), &[]).unwrap()
}

#[test]
fn chart_for_empty_series_is_placeholder() {
    assert_eq!(price_chart_svg(&series(0)), "<p>No price data available.</p>");
}

#[test]
fn chart_draws_one_point_per_bar() {
    let svg = price_chart_svg(&series(5));
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("width=\"640\""));
    let points = svg
        .split("points=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap();
    assert_eq!(points.split(' ').count(), 5);
}

#[test]
fn idle_page_lists_every_suggestion_button() {
    let page = PageState::new(QueryState::default(), RenderState::Idle);
    let html = render(&page);

    assert!(html.contains("@media (max-width:640px)"));
    for (i, question) in SUGGESTED_QUESTIONS.iter().enumerate() {
        let button = format!(
            "<button type=\"submit\" name=\"suggestion\" value=\"{}\">{}</button>",
            i, question
        );
        assert!(html.contains(&button), "missing button for {}", question);
    }
    assert!(html.contains("<option value=\"6mo\" selected>"));
}

#[test]
fn ready_page_shows_chart_and_insight() {
    let insight = build_insight("Apple outlook", Some("AAPL"), &Portfolio::default());
    let page = PageState::new(
        QueryState::default(),
        RenderState::Ready {
            insight: Some(insight),
            series: Some(Arc::new(series(3))),
        },
    );
    let html = render(&page);

    assert!(html.contains("AAPL price trend (1 month)"));
    assert!(html.contains("Last close: 102.00"));
    assert!(html.contains("<svg class=\"price-chart\""));
    assert!(html.contains("<svg class=\"fx-chart\""));
    assert!(html.contains("ESG analysis"));
    assert!(html.contains("Market news 3"));
}

#[test]
fn idle_page_has_no_exchange_rate_chart() {
    let html = render(&PageState::new(QueryState::default(), RenderState::Idle));
    assert!(!html.contains("fx-chart"));
}

#[test]
fn failed_page_shows_user_message() {
    let page = PageState::new(
        QueryState::default(),
        RenderState::Failed {
            insight: None,
            error: FetchError::EmptyData {
                ticker: "ZZZINVALID".to_string(),
                period: "1mo".to_string(),
            },
        },
    );
    let html = render(&page);
    assert!(html.contains("No price data found for ZZZINVALID over 1mo."));
}

#[test]
fn user_question_is_escaped() {
    let mut query = QueryState::default();
    query.question = Some("<script>alert(1)</script>".to_string());
    let page = PageState::new(query, RenderState::Warning("<oops>".to_string()));
    let html = render(&page);
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;oops&gt;"));
}

#[test]
fn history_sidebar_lists_newest_first_and_escapes() {
    let history = vec![
        HistoryEntry::new("first question", "first answer"),
        HistoryEntry::new("<b>second</b>", "second answer"),
    ];
    let page = PageState::new(QueryState::default(), RenderState::Idle);
    let html = render_page(&page, &Portfolio::default(), &history).unwrap();

    let newest = html.find("&lt;b&gt;second&lt;/b&gt;").unwrap();
    let oldest = html.find("first question").unwrap();
    assert!(newest < oldest);
    assert!(html.contains("Conversation 1"));
    assert!(html.contains("Conversation 2"));
    assert!(!html.contains("<b>second</b>"));
}

#[test]
fn empty_history_shows_placeholder() {
    let html = render(&PageState::new(QueryState::default(), RenderState::Idle));
    assert!(html.contains("No questions yet."));
}

#[test]
fn tool_tabs_render_their_forms() {
    let summary = render(&PageState::new(QueryState::default(), RenderState::Idle).with_tab(Tab::Summary));
    assert!(summary.contains("action=\"/tools/summary\""));
    assert!(!summary.contains("name=\"suggestion\""));

    let report = render(&PageState::new(QueryState::default(), RenderState::Idle).with_tab(Tab::Report));
    assert!(report.contains("action=\"/tools/report\""));
    assert!(report.contains(&format!("value=\"{}\"", DEFAULT_REPORT_COMPANY)));

    let disclosure =
        render(&PageState::new(QueryState::default(), RenderState::Idle).with_tab(Tab::Disclosure));
    assert!(disclosure.contains("action=\"/tools/disclosure\""));
}

#[test]
fn tool_results_and_warnings_render() {
    let mut page = PageState::new(QueryState::default(), RenderState::Idle).with_tab(Tab::Report);
    page.tool = Some(ToolOutcome::Report(generate_report("Apple").unwrap()));
    let html = render(&page);
    assert!(html.contains("Apple (AAPL) report"));
    assert!(html.contains("Apple investment report sample."));
    assert!(html.contains("value=\"Apple\""));

    let mut page = PageState::new(QueryState::default(), RenderState::Idle).with_tab(Tab::Disclosure);
    page.tool = Some(ToolRequest::ExplainDisclosure("  ".to_string()).run());
    let html = render(&page);
    assert!(html.contains("class=\"warning\">Please enter the English text to translate.</p>"));

    let mut page = PageState::new(QueryState::default(), RenderState::Idle).with_tab(Tab::Disclosure);
    page.tool = Some(ToolRequest::ExplainDisclosure("Revenue rose.".to_string()).run());
    let html = render(&page);
    assert!(html.contains("<h4>Translation</h4>"));
    assert!(html.contains("<h4>Commentary</h4>"));
}

#[test]
fn portfolio_tab_shows_holdings_and_pie() {
    let page = PageState::new(QueryState::default(), RenderState::Idle).with_tab(Tab::Portfolio);
    let html = render(&page);
    assert!(html.contains("<td>005930.KS</td>"));
    assert!(html.contains("<svg class=\"portfolio-pie\""));
    assert!(html.contains("삼성전자 50.0%"));
    assert!(html.contains("카카오 50.0%"));
}

#[test]
fn pie_slices_skip_unusable_weights() {
    let portfolio = Portfolio::new(vec![
        Holding::new("AAPL", "Apple", "30"),
        Holding::new("MSFT", "Microsoft", "10"),
        Holding::new("TSLA", "Tesla", "n/a"),
        Holding::new("META", "Meta", "0"),
    ]);
    let slices = portfolio_slices(&portfolio);

    assert_eq!(slices.len(), 2);
    assert!((slices[0].share - 0.75).abs() < 1e-9);
    assert_eq!(slices[1].percent(), "25.0%");
    assert_ne!(slices[0].color, slices[1].color);
}

#[test]
fn pie_chart_draws_one_ring_segment_per_slice() {
    let portfolio = Portfolio::new(vec![
        Holding::new("AAPL", "Apple", "60"),
        Holding::new("MSFT", "Microsoft", "40"),
    ]);
    let svg = portfolio_pie_svg(&portfolio_slices(&portfolio));
    assert_eq!(svg.matches("<circle").count(), 2);
    assert_eq!(svg.matches("stroke-dasharray").count(), 2);

    assert_eq!(portfolio_pie_svg(&[]), "<p>No holdings to chart.</p>");
}

#[test]
fn fx_chart_spans_the_sample_week() {
    let end = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    let svg = fx_chart_svg(&usd_krw_trend(end));
    assert!(svg.contains(">06-22</text>"));
    assert!(svg.contains(">06-28</text>"));
    assert!(svg.contains(">1330.00</text>"));
    assert!(svg.contains(">1310.00</text>"));
}

#[test]
fn insight_page_anchors_fx_chart_on_given_day() {
    let insight = build_insight("Rates?", None, &Portfolio::default());
    let page = PageState::new(
        QueryState::default(),
        RenderState::Ready {
            insight: Some(insight),
            series: None,
        },
    );
    let end = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
    let html = render_page_on(&page, &Portfolio::default(), &[], end).unwrap();
    assert!(html.contains(">12-28</text>"));
    assert!(html.contains(">01-03</text>"));
}
