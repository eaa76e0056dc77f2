//! Canned writing tools shown next to the Q&A: long-text summary, company
//! report and disclosure translation.

use serde::Serialize;
use thiserror::Error;

use super::detect_ticker;

/// Company pre-filled in the report form.
pub const DEFAULT_REPORT_COMPANY: &str = "삼성전자";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Please enter some text to summarize.")]
    EmptyText,
    #[error("Please enter a company name.")]
    EmptyCompany,
    #[error("Please enter the English text to translate.")]
    EmptyDisclosure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummary {
    pub characters: usize,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyReport {
    pub company: String,
    pub ticker: Option<String>,
    pub report: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisclosureNote {
    pub translation: String,
    pub commentary: String,
}

pub fn summarize_long_text(text: &str) -> Result<TextSummary, ToolError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ToolError::EmptyText);
    }
    Ok(TextSummary {
        characters: text.chars().count(),
        summary: "A sample summary of the long-form text you entered would appear here."
            .to_string(),
    })
}

pub fn generate_report(company: &str) -> Result<CompanyReport, ToolError> {
    let company = company.trim();
    if company.is_empty() {
        return Err(ToolError::EmptyCompany);
    }
    Ok(CompanyReport {
        company: company.to_string(),
        ticker: detect_ticker(company),
        report: format!(
            "{} investment report sample. Key points and risks are summarised here.",
            company
        ),
    })
}

pub fn explain_disclosure(text: &str) -> Result<DisclosureNote, ToolError> {
    if text.trim().is_empty() {
        return Err(ToolError::EmptyDisclosure);
    }
    Ok(DisclosureNote {
        translation: "Sample translation of the disclosure.".to_string(),
        commentary: "Sample commentary from an investor's point of view.".to_string(),
    })
}
