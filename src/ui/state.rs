//! Dashboard state transitions.
//!
//! A UI event updates the query state; the resulting [`Transition`] says
//! whether a price fetch must run. The controller then performs the fetch
//! and produces the render state.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::PriceFetchCache;
use crate::error::FetchError;
use crate::insights::tools::{
    explain_disclosure, generate_report, summarize_long_text, CompanyReport, DisclosureNote,
    TextSummary,
};
use crate::insights::{build_insight, detect_ticker, Insight, SUGGESTED_QUESTIONS};
use crate::models::{normalize_ticker, Period, Portfolio, PriceQuery, PriceSeries};

use super::history::HistoryEntry;

pub const EMPTY_QUESTION_WARNING: &str = "Please enter a question.";

/// Dashboard panels, addressed by `?tab=` on the page URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Ask,
    Summary,
    Report,
    Disclosure,
    Portfolio,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Ask,
        Tab::Summary,
        Tab::Report,
        Tab::Disclosure,
        Tab::Portfolio,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Tab::Ask => "ask",
            Tab::Summary => "summary",
            Tab::Report => "report",
            Tab::Disclosure => "disclosure",
            Tab::Portfolio => "portfolio",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Ask => "Q&A",
            Tab::Summary => "Long-text summary",
            Tab::Report => "Company report",
            Tab::Disclosure => "Disclosure translation",
            Tab::Portfolio => "Portfolio",
        }
    }

    /// Unknown codes fall back to the Q&A tab.
    pub fn from_code(code: &str) -> Tab {
        Tab::ALL
            .into_iter()
            .find(|tab| tab.code().eq_ignore_ascii_case(code.trim()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    PageLoaded,
    SuggestionClicked(usize),
    QuestionSubmitted(String),
    TickerSelected(String),
    PeriodSelected(Period),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryState {
    pub question: Option<String>,
    pub ticker: Option<String>,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Nothing to fetch; render whatever state we have.
    Unchanged,
    /// Query state changed and a price fetch is required.
    Fetch(PriceQuery),
    /// Query state changed but there is no ticker to chart.
    InsightOnly,
    Warn(String),
}

impl QueryState {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    pub fn apply(&mut self, event: UiEvent) -> Transition {
        match event {
            UiEvent::PageLoaded => match self.ticker.as_deref() {
                Some(ticker) => self.fetch_for(ticker),
                None => Transition::Unchanged,
            },
            UiEvent::SuggestionClicked(index) => match SUGGESTED_QUESTIONS.get(index) {
                Some(question) => self.ask(question),
                None => Transition::Warn(format!("Unknown suggested question #{}.", index)),
            },
            UiEvent::QuestionSubmitted(question) => {
                if question.trim().is_empty() {
                    Transition::Warn(EMPTY_QUESTION_WARNING.to_string())
                } else {
                    self.ask(&question)
                }
            }
            UiEvent::TickerSelected(raw) => match normalize_ticker(&raw) {
                Ok(ticker) => {
                    let transition = self.fetch_for(&ticker);
                    self.ticker = Some(ticker);
                    transition
                }
                Err(err) => Transition::Warn(err.to_string()),
            },
            UiEvent::PeriodSelected(period) => {
                self.period = period;
                match self.ticker.as_deref() {
                    Some(ticker) => self.fetch_for(ticker),
                    None => Transition::Unchanged,
                }
            }
        }
    }

    fn ask(&mut self, question: &str) -> Transition {
        let question = question.trim().to_string();
        self.ticker = detect_ticker(&question);
        self.question = Some(question);
        match self.ticker.as_deref() {
            Some(ticker) => self.fetch_for(ticker),
            None => Transition::InsightOnly,
        }
    }

    fn fetch_for(&self, ticker: &str) -> Transition {
        match PriceQuery::new(ticker, self.period) {
            Ok(query) => Transition::Fetch(query),
            Err(err) => Transition::Warn(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RenderState {
    Idle,
    Warning(String),
    Ready {
        insight: Option<Insight>,
        series: Option<Arc<PriceSeries>>,
    },
    Failed {
        insight: Option<Insight>,
        error: FetchError,
    },
}

impl RenderState {
    pub fn insight(&self) -> Option<&Insight> {
        match self {
            RenderState::Ready { insight, .. } | RenderState::Failed { insight, .. } => {
                insight.as_ref()
            }
            RenderState::Idle | RenderState::Warning(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Summarize(String),
    Report(String),
    ExplainDisclosure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Summary(TextSummary),
    Report(CompanyReport),
    Disclosure(DisclosureNote),
    Warning(String),
}

impl ToolRequest {
    pub fn tab(&self) -> Tab {
        match self {
            ToolRequest::Summarize(_) => Tab::Summary,
            ToolRequest::Report(_) => Tab::Report,
            ToolRequest::ExplainDisclosure(_) => Tab::Disclosure,
        }
    }

    pub fn run(&self) -> ToolOutcome {
        let outcome = match self {
            ToolRequest::Summarize(text) => summarize_long_text(text).map(ToolOutcome::Summary),
            ToolRequest::Report(company) => generate_report(company).map(ToolOutcome::Report),
            ToolRequest::ExplainDisclosure(text) => {
                explain_disclosure(text).map(ToolOutcome::Disclosure)
            }
        };
        outcome.unwrap_or_else(|err| ToolOutcome::Warning(err.to_string()))
    }
}

impl ToolOutcome {
    pub fn history_entry(&self) -> Option<HistoryEntry> {
        match self {
            ToolOutcome::Summary(summary) => {
                Some(HistoryEntry::new("Long-text summary", summary.summary.as_str()))
            }
            ToolOutcome::Report(report) => Some(HistoryEntry::new(
                format!("{} report", report.company),
                report.report.as_str(),
            )),
            ToolOutcome::Disclosure(note) => Some(HistoryEntry::new(
                "Disclosure commentary",
                format!("{} {}", note.translation, note.commentary),
            )),
            ToolOutcome::Warning(_) => None,
        }
    }
}

/// Everything the page needs to render after one interaction.
#[derive(Debug, Clone)]
pub struct PageState {
    pub query: QueryState,
    pub render: RenderState,
    pub tab: Tab,
    pub tool: Option<ToolOutcome>,
}

impl PageState {
    pub fn new(query: QueryState, render: RenderState) -> Self {
        Self {
            query,
            render,
            tab: Tab::Ask,
            tool: None,
        }
    }

    pub fn with_tab(mut self, tab: Tab) -> Self {
        self.tab = tab;
        self
    }

    /// What this interaction adds to the session history, if anything.
    pub fn history_entry(&self) -> Option<HistoryEntry> {
        if let Some(tool) = &self.tool {
            return tool.history_entry();
        }
        self.render
            .insight()
            .map(|insight| HistoryEntry::new(insight.question.as_str(), insight.summary.as_str()))
    }
}

/// Drives the event -> query -> fetch -> render pipeline.
pub struct DashboardController {
    prices: Arc<PriceFetchCache>,
    portfolio: Arc<Portfolio>,
}

impl DashboardController {
    pub fn new(prices: Arc<PriceFetchCache>, portfolio: Arc<Portfolio>) -> Self {
        Self { prices, portfolio }
    }

    /// Applies `events` in order, then runs at most one fetch for the final
    /// query state.
    pub async fn dispatch(&self, mut query: QueryState, events: Vec<UiEvent>) -> PageState {
        let mut transition = Transition::Unchanged;
        for event in events {
            debug!(event = ?event, "Dashboard event");
            let next = query.apply(event);
            transition = match (transition, next) {
                (Transition::Warn(w), _) => Transition::Warn(w),
                (previous, Transition::Unchanged) => previous,
                (_, next) => next,
            };
        }

        let insight = query
            .question
            .as_deref()
            .map(|q| build_insight(q, query.ticker.as_deref(), &self.portfolio));

        let render = match transition {
            Transition::Warn(message) => RenderState::Warning(message),
            Transition::Unchanged => RenderState::Idle,
            Transition::InsightOnly => RenderState::Ready {
                insight,
                series: None,
            },
            Transition::Fetch(price_query) => match self.prices.get(&price_query).await {
                Ok(series) => RenderState::Ready {
                    insight,
                    series: Some(series),
                },
                Err(error) => RenderState::Failed { insight, error },
            },
        };

        PageState::new(query, render)
    }

    /// Runs one of the canned writing tools and shows its panel.
    pub fn run_tool(&self, query: QueryState, request: ToolRequest) -> PageState {
        debug!(tool = request.tab().code(), "Dashboard tool");
        PageState {
            query,
            render: RenderState::Idle,
            tab: request.tab(),
            tool: Some(request.run()),
        }
    }
}
