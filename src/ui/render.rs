//! Dashboard page rendering: askama templates plus inline SVG charts.

use std::f64::consts::PI;

use askama::Template;
use chrono::{NaiveDate, Utc};

use crate::error::FetchError;
use crate::insights::tools::DEFAULT_REPORT_COMPANY;
use crate::insights::{usd_krw_trend, Insight, RatePoint, SUGGESTED_QUESTIONS};
use crate::models::{Period, Portfolio, PriceSeries};

use super::history::HistoryEntry;
use super::state::{PageState, RenderState, Tab, ToolOutcome};

const CHART_WIDTH: f64 = 640.0;
const CHART_HEIGHT: f64 = 240.0;
const CHART_PADDING: f64 = 40.0;

const PIE_SIZE: f64 = 240.0;
const PIE_RADIUS: f64 = 100.0;
const PIE_HOLE: f64 = 0.3;
const PIE_COLORS: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

/// Line chart over `(label, value)` points. Labels of the first and last
/// point are printed under the x axis.
fn line_chart_svg(class: &str, aria_label: &str, points: &[(String, f64)]) -> String {
    let min = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);

    let plot_width = CHART_WIDTH - 2.0 * CHART_PADDING;
    let plot_height = CHART_HEIGHT - 2.0 * CHART_PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = if points.len() > 1 {
        plot_width / (points.len() - 1) as f64
    } else {
        0.0
    };

    let polyline: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, (_, value))| {
            let x = CHART_PADDING + i as f64 * scale_x;
            let y = CHART_HEIGHT - CHART_PADDING - (value - min) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    let first = points.first().map(|(label, _)| label.as_str()).unwrap_or_default();
    let last = points.last().map(|(label, _)| label.as_str()).unwrap_or_default();

    format!(
        r##"<svg class="{class}" xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" role="img" aria-label="{aria_label}">
<line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{base:.0}" stroke="#999"/>
<line x1="{p:.0}" y1="{base:.0}" x2="{right:.0}" y2="{base:.0}" stroke="#999"/>
<polyline fill="none" stroke="#1f77b4" stroke-width="2" points="{points}"/>
<text x="{p:.0}" y="{label_y:.0}" font-size="11">{first}</text>
<text x="{right:.0}" y="{label_y:.0}" font-size="11" text-anchor="end">{last}</text>
<text x="4" y="{p:.0}" font-size="11">{max:.2}</text>
<text x="4" y="{base:.0}" font-size="11">{min:.2}</text>
</svg>"##,
        class = class,
        aria_label = aria_label,
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        p = CHART_PADDING,
        base = CHART_HEIGHT - CHART_PADDING,
        right = CHART_WIDTH - CHART_PADDING,
        label_y = CHART_HEIGHT - CHART_PADDING / 2.0,
        points = polyline.join(" "),
        first = first,
        last = last,
        max = max,
        min = min,
    )
}

/// Inline SVG line chart of closing prices.
pub fn price_chart_svg(series: &PriceSeries) -> String {
    if series.is_empty() {
        return "<p>No price data available.</p>".to_string();
    }
    let points: Vec<(String, f64)> = series
        .bars
        .iter()
        .map(|bar| (bar.timestamp.format("%Y-%m-%d").to_string(), bar.close))
        .collect();
    // Tickers are restricted to [A-Z0-9.-^=], safe inside an attribute.
    line_chart_svg(
        "price-chart",
        &format!("{} closing prices", series.ticker),
        &points,
    )
}

/// Inline SVG line chart of the USD/KRW exchange rate.
pub fn fx_chart_svg(trend: &[RatePoint]) -> String {
    if trend.is_empty() {
        return "<p>No exchange rate data available.</p>".to_string();
    }
    let points: Vec<(String, f64)> = trend
        .iter()
        .map(|point| (point.date.format("%m-%d").to_string(), point.rate))
        .collect();
    line_chart_svg("fx-chart", "USD/KRW exchange rate", &points)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    /// Fraction of the whole, 0.0 to 1.0.
    pub share: f64,
    pub color: &'static str,
}

impl PieSlice {
    pub fn percent(&self) -> String {
        format!("{:.1}%", self.share * 100.0)
    }
}

/// Holdings with a positive numeric weight, as shares of their total.
pub fn portfolio_slices(portfolio: &Portfolio) -> Vec<PieSlice> {
    let weighted: Vec<(&str, f64)> = portfolio
        .holdings
        .iter()
        .map(|h| (h.name.as_str(), h.weight_pct()))
        .filter(|(_, weight)| weight.is_finite() && *weight > 0.0)
        .collect();
    let total: f64 = weighted.iter().map(|(_, weight)| weight).sum();

    weighted
        .into_iter()
        .enumerate()
        .map(|(i, (label, weight))| PieSlice {
            label: label.to_string(),
            share: weight / total,
            color: PIE_COLORS[i % PIE_COLORS.len()],
        })
        .collect()
}

/// Donut chart of portfolio weights. Each slice is a stroked circle segment,
/// so a single 100% holding still draws a full ring. Labels live in the
/// legend rendered by the template.
pub fn portfolio_pie_svg(slices: &[PieSlice]) -> String {
    if slices.is_empty() {
        return "<p>No holdings to chart.</p>".to_string();
    }

    let center = PIE_SIZE / 2.0;
    let inner = PIE_RADIUS * PIE_HOLE;
    let ring_radius = (PIE_RADIUS + inner) / 2.0;
    let ring_width = PIE_RADIUS - inner;
    let circumference = 2.0 * PI * ring_radius;

    let mut svg = format!(
        r#"<svg class="portfolio-pie" xmlns="http://www.w3.org/2000/svg" width="{s:.0}" height="{s:.0}" viewBox="0 0 {s:.0} {s:.0}" role="img" aria-label="Portfolio weights"><g transform="rotate(-90 {c:.0} {c:.0})">"#,
        s = PIE_SIZE,
        c = center,
    );
    let mut offset = 0.0;
    for slice in slices {
        let length = slice.share * circumference;
        svg.push_str(&format!(
            r#"<circle cx="{c:.0}" cy="{c:.0}" r="{r:.2}" fill="none" stroke="{color}" stroke-width="{width:.2}" stroke-dasharray="{length:.2} {circumference:.2}" stroke-dashoffset="{offset:.2}"/>"#,
            c = center,
            r = ring_radius,
            color = slice.color,
            width = ring_width,
            length = length,
            circumference = circumference,
            offset = -offset,
        ));
        offset += length;
    }
    svg.push_str("</g></svg>");
    svg
}

/// Message shown to the user when a price lookup fails.
pub fn error_message(error: &FetchError) -> String {
    match error {
        FetchError::InvalidQuery(msg) => format!("Invalid request: {}", msg),
        FetchError::EmptyData { ticker, period } => format!(
            "No price data found for {} over {}. Check the ticker symbol.",
            ticker, period
        ),
        FetchError::Network(_) | FetchError::MalformedResponse(_) => {
            "The market data service is unavailable right now. Please try again.".to_string()
        }
    }
}

struct TabLink {
    code: &'static str,
    label: &'static str,
    active: bool,
}

struct PeriodOption {
    code: &'static str,
    label: &'static str,
    selected: bool,
}

struct Suggestion {
    index: usize,
    question: &'static str,
}

struct ChartView {
    ticker: String,
    period_label: &'static str,
    last_close: Option<String>,
    svg: String,
}

struct ToolSection {
    heading: Option<&'static str>,
    text: String,
}

struct ToolView {
    title: String,
    sections: Vec<ToolSection>,
}

struct HoldingRow<'a> {
    symbol: &'a str,
    name: &'a str,
    weight: &'a str,
}

struct HistoryItem<'a> {
    number: usize,
    question: &'a str,
    answer: &'a str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    tabs: Vec<TabLink>,
    tab: &'static str,
    question: &'a str,
    period_code: &'static str,
    periods: Vec<PeriodOption>,
    suggestions: Vec<Suggestion>,
    warning: Option<String>,
    error: Option<String>,
    chart: Option<ChartView>,
    insight: Option<&'a Insight>,
    fx_chart: Option<String>,
    tool_warning: Option<&'a str>,
    tool_result: Option<ToolView>,
    report_company: &'a str,
    holdings: Vec<HoldingRow<'a>>,
    slices: Vec<PieSlice>,
    pie_chart: String,
    history: Vec<HistoryItem<'a>>,
}

fn chart_view(series: &PriceSeries) -> ChartView {
    let last_close = series.last_close().map(|close| match series.total_return() {
        Some(change) => format!("{:.2} ({:+.2}% over the period)", close, change * 100.0),
        None => format!("{:.2}", close),
    });
    ChartView {
        ticker: series.ticker.clone(),
        period_label: series.period.label(),
        last_close,
        svg: price_chart_svg(series),
    }
}

fn tool_view(outcome: &ToolOutcome) -> Option<ToolView> {
    let view = match outcome {
        ToolOutcome::Summary(summary) => ToolView {
            title: format!("Summary of {} characters", summary.characters),
            sections: vec![ToolSection {
                heading: None,
                text: summary.summary.clone(),
            }],
        },
        ToolOutcome::Report(report) => ToolView {
            title: match &report.ticker {
                Some(ticker) => format!("{} ({}) report", report.company, ticker),
                None => format!("{} report", report.company),
            },
            sections: vec![ToolSection {
                heading: None,
                text: report.report.clone(),
            }],
        },
        ToolOutcome::Disclosure(note) => ToolView {
            title: "Disclosure".to_string(),
            sections: vec![
                ToolSection {
                    heading: Some("Translation"),
                    text: note.translation.clone(),
                },
                ToolSection {
                    heading: Some("Commentary"),
                    text: note.commentary.clone(),
                },
            ],
        },
        ToolOutcome::Warning(_) => return None,
    };
    Some(view)
}

/// Renders the full dashboard page. `history` is oldest first; the sidebar
/// lists it newest first. `today` anchors the exchange rate chart.
pub fn render_page_on(
    page: &PageState,
    portfolio: &Portfolio,
    history: &[HistoryEntry],
    today: NaiveDate,
) -> Result<String, askama::Error> {
    let (warning, error, chart) = match &page.render {
        RenderState::Idle => (None, None, None),
        RenderState::Warning(message) => (Some(message.clone()), None, None),
        RenderState::Ready { series, .. } => (None, None, series.as_deref().map(chart_view)),
        RenderState::Failed { error, .. } => (None, Some(error_message(error)), None),
    };
    let insight = page.render.insight();

    let tool_warning = match &page.tool {
        Some(ToolOutcome::Warning(message)) => Some(message.as_str()),
        _ => None,
    };
    let report_company = match &page.tool {
        Some(ToolOutcome::Report(report)) => report.company.as_str(),
        _ => DEFAULT_REPORT_COMPANY,
    };

    let slices = portfolio_slices(portfolio);
    let template = DashboardTemplate {
        tabs: Tab::ALL
            .into_iter()
            .map(|tab| TabLink {
                code: tab.code(),
                label: tab.label(),
                active: tab == page.tab,
            })
            .collect(),
        tab: page.tab.code(),
        question: page.query.question.as_deref().unwrap_or(""),
        period_code: page.query.period.code(),
        periods: Period::ALL
            .into_iter()
            .map(|period| PeriodOption {
                code: period.code(),
                label: period.label(),
                selected: period == page.query.period,
            })
            .collect(),
        suggestions: SUGGESTED_QUESTIONS
            .iter()
            .copied()
            .enumerate()
            .map(|(index, question)| Suggestion { index, question })
            .collect(),
        warning,
        error,
        chart,
        insight,
        fx_chart: insight.map(|_| fx_chart_svg(&usd_krw_trend(today))),
        tool_warning,
        tool_result: page.tool.as_ref().and_then(tool_view),
        report_company,
        holdings: portfolio
            .holdings
            .iter()
            .map(|h| HoldingRow {
                symbol: &h.symbol,
                name: &h.name,
                weight: &h.weight,
            })
            .collect(),
        pie_chart: portfolio_pie_svg(&slices),
        slices,
        history: history
            .iter()
            .rev()
            .enumerate()
            .map(|(i, entry)| HistoryItem {
                number: i + 1,
                question: &entry.question,
                answer: &entry.answer,
            })
            .collect(),
    };
    template.render()
}

pub fn render_page(
    page: &PageState,
    portfolio: &Portfolio,
    history: &[HistoryEntry],
) -> Result<String, askama::Error> {
    render_page_on(page, portfolio, history, Utc::now().date_naive())
}
