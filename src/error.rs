use std::path::PathBuf;

use thiserror::Error;

use crate::zai::TransportError;

/// Errors that stop a command before (or instead of) processing items.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Config(String),

    #[error("System prompt file not found: {0}")]
    MissingPrompt(PathBuf),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl PipelineError {
    /// Configuration problems end the process with a non-zero exit code.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PipelineError::Config(_) | PipelineError::MissingPrompt(_) | PipelineError::Toml(_)
        )
    }
}

/// Why one call-and-parse round trip did not yield a usable review.
///
/// Every variant is retried by re-running the whole round trip.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("API call failed after all retries: {0}")]
    Transport(#[from] TransportError),

    #[error("No choices in API response")]
    NoChoices,

    #[error("API response has no message content")]
    EmptyContent,

    #[error("Response processing error: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Review is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Reading the per-item records that accompany a query file.
#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("companion record not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persisting an output artifact.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize artifact: {0}")]
    Json(#[from] serde_json::Error),
}
