//! Review documents: the JSON the model returns and the artifacts we persist.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sanitize::strip_cjk_in_place;
use crate::error::ProcessingError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityBreakdown {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryBreakdown {
    pub performance: u64,
    pub nplus1: u64,
    pub hibernate: u64,
    pub code_quality: u64,
    pub index: u64,
}

/// The fixed-shape `summary` block of a review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSummary {
    pub performance_score: Option<f64>,
    pub complexity_score: Option<f64>,
    pub total_issues: u64,
    pub by_severity: SeverityBreakdown,
    pub by_category: CategoryBreakdown,
    pub overall_assessment: String,
    pub priority: String,
    pub effort_to_fix: String,
}

/// A complete review as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDocument {
    pub summary: ReviewSummary,
    #[serde(default)]
    pub issues: Vec<Value>,
}

/// A model response that passed validation.
///
/// `document` keeps every field the model produced (sanitized); `summary` is
/// the typed view used for accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReview {
    pub document: Value,
    pub summary: ReviewSummary,
}

impl ParsedReview {
    pub fn issue_count(&self) -> u64 {
        self.summary.total_issues
    }

    pub fn score(&self) -> Option<f64> {
        self.summary.performance_score
    }
}

/// Parses the message content of a review response.
///
/// The content must be a JSON object with a `summary` object whose known
/// fields have the expected types. String values are stripped of CJK
/// characters before the summary is read.
pub fn parse_review(content: &str) -> Result<ParsedReview, ProcessingError> {
    let mut document: Value = serde_json::from_str(content)?;
    strip_cjk_in_place(&mut document);

    let summary = document
        .get("summary")
        .filter(|s| s.is_object())
        .cloned()
        .ok_or(ProcessingError::MissingField("summary"))?;
    let summary: ReviewSummary = serde_json::from_value(summary)?;

    Ok(ParsedReview { document, summary })
}
