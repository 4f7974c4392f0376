use std::fmt;

use serde::Serialize;

/// Why an item finished without producing a fresh artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The execution-info record for the item does not exist.
    MissingCompanionData,
    /// Another worker already claimed the item's output identity.
    Duplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingCompanionData => write!(f, "missing companion data"),
            SkipReason::Duplicate => write!(f, "duplicate output identity"),
        }
    }
}

/// What a successful item produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessDetail {
    pub issue_count: u64,
    /// `None` when the review carried no numeric score.
    pub score: Option<f64>,
    /// Set when the item took the bypass path and never reached the API.
    pub bypassed: bool,
}

/// The single, final result of one work item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageResult {
    Success { detail: SuccessDetail },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

impl StageResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        StageResult::Failed {
            reason: reason.into(),
        }
    }

    #[cfg(test)]
    pub fn is_success(&self) -> bool {
        matches!(self, StageResult::Success { .. })
    }
}

impl fmt::Display for StageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageResult::Success { detail } if detail.bypassed => write!(f, "success (bypassed)"),
            StageResult::Success { detail } => match detail.score {
                Some(score) => write!(f, "success: {} issues, score={score}", detail.issue_count),
                None => write!(f, "success: {} issues, score=N/A", detail.issue_count),
            },
            StageResult::Skipped { reason } => write!(f, "skipped: {reason}"),
            StageResult::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
