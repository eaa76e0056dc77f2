//! Per-session question/answer history shown in the sidebar.

use serde::{Deserialize, Serialize};

/// Session key the history is stored under.
pub const HISTORY_SESSION_KEY: &str = "qa_history";
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
}

impl HistoryEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Appends `entry`, dropping the oldest entries beyond [`HISTORY_LIMIT`].
pub fn push_entry(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    history.push(entry);
    if history.len() > HISTORY_LIMIT {
        let overflow = history.len() - HISTORY_LIMIT;
        history.drain(..overflow);
    }
}
