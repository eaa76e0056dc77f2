//! Dashboard page: explicit state transitions, session history and
//! template rendering.

pub mod history;
pub mod render;
pub mod state;

pub use history::{push_entry, HistoryEntry, HISTORY_LIMIT, HISTORY_SESSION_KEY};
pub use render::{
    error_message, fx_chart_svg, portfolio_pie_svg, portfolio_slices, price_chart_svg,
    render_page, render_page_on, PieSlice,
};
pub use state::{
    DashboardController, PageState, QueryState, RenderState, Tab, ToolOutcome, ToolRequest,
    Transition, UiEvent, EMPTY_QUESTION_WARNING,
};
