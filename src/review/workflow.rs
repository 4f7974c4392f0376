//! Per-item review: classify, call, validate, persist.
//!
//! Two retry budgets apply. The [`CallAdapter`] retries transport faults on
//! its own; this module re-runs the whole call-and-parse round trip when the
//! adapter gives up or the reply cannot be used. Both budgets come from the
//! same `max_retries`, so one item can cost up to `(max_retries + 1)²` HTTP
//! calls when every attempt at both layers fails.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use super::bypass::{BYPASS_SCORE, bypass_document, is_session_statement};
use super::document::{ParsedReview, parse_review};
use super::inputs::CompanionReader;
use super::state::{State, Trail};
use crate::error::{CompanionError, ProcessingError};
use crate::executor::{Position, StageWorker};
use crate::items::WorkItem;
use crate::outcome::{SkipReason, StageResult, SuccessDetail};
use crate::retry::{self, Failure, RetryOutcome, RetryPolicy};
use crate::sink::{ResultSink, WriteOutcome};
use crate::stats::StatsAggregator;
use crate::zai::{CallAdapter, ChatRequest, ChatTransport};

/// Request and retry parameters shared by every item of a run.
#[derive(Debug, Clone)]
pub struct ReviewSettings {
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub bypass_assessment: String,
    /// Budget for whole round trips (the adapter has its own).
    pub processing_policy: RetryPolicy,
}

/// Where the companion records live.
#[derive(Debug, Clone)]
pub struct ReviewInputs {
    /// Execution info; required.
    pub sql_info: CompanionReader,
    /// Schema metadata; optional.
    pub metadata: CompanionReader,
}

pub struct ReviewWorkflow<T> {
    adapter: CallAdapter<T>,
    sink: ResultSink,
    inputs: ReviewInputs,
    settings: ReviewSettings,
}

impl<T: ChatTransport> ReviewWorkflow<T> {
    pub fn new(
        adapter: CallAdapter<T>,
        sink: ResultSink,
        inputs: ReviewInputs,
        settings: ReviewSettings,
    ) -> Self {
        Self {
            adapter,
            sink,
            inputs,
            settings,
        }
    }

    #[cfg(test)]
    pub fn adapter(&self) -> &CallAdapter<T> {
        &self.adapter
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        self.adapter.stats()
    }

    /// Reviews one item, returning its result and the states it went through.
    pub async fn review(&self, item: &WorkItem, position: Position) -> (StageResult, Trail) {
        let started = Instant::now();
        let mut trail = Trail::new();
        info!("{position} Reviewing: {}", item.file_name());

        let result = self.drive(item, position, &mut trail).await;
        trail.advance(State::Done);

        let took = format!("Reviewed in {:.2}s", started.elapsed().as_secs_f64());
        let name = item.file_name();
        match &result {
            StageResult::Success { detail } if detail.bypassed => {
                info!("{position} ✓ Skipped {name}: ALTER SESSION command (not a query) - {took}")
            }
            StageResult::Success { detail } => match detail.score {
                Some(score) => info!(
                    "{position} ✓ Reviewed {name}: {} issues, score={score} - {took}",
                    detail.issue_count
                ),
                None => info!(
                    "{position} ✓ Reviewed {name}: {} issues, score=N/A - {took}",
                    detail.issue_count
                ),
            },
            StageResult::Skipped { reason } => {
                warn!("{position} ⚠ Skipped {name}: {reason} - {took}")
            }
            StageResult::Failed { reason } => {
                error!("{position} ✗ Failed to review {name}: {reason} - {took}")
            }
        }
        debug_assert!(trail.current().is_terminal());
        let id = item.identity();
        debug!(
            agent = %id.agent,
            transaction = %id.transaction,
            index = id.index,
            round_trips = trail.round_trips(),
            "{id}: {trail}"
        );

        (result, trail)
    }

    async fn drive(&self, item: &WorkItem, position: Position, trail: &mut Trail) -> StageResult {
        let raw = match tokio::fs::read_to_string(item.source()).await {
            Ok(raw) => raw,
            Err(e) => {
                let path = item.source().display();
                return StageResult::failed(format!("failed to read {path}: {e}"));
            }
        };

        let sql = raw.trim();
        if is_session_statement(sql) {
            trail.advance(State::BypassDone);
            let document = bypass_document(&self.settings.bypass_assessment);
            let detail = SuccessDetail {
                issue_count: 0,
                score: Some(BYPASS_SCORE),
                bypassed: true,
            };
            return self.persist(item, &document, detail).await;
        }

        let sql_info = match self.inputs.sql_info.read(item).await {
            Ok(info) => info,
            Err(CompanionError::NotFound(path)) => {
                let path = path.display();
                debug!(item = item.name(), "execution info not found at {path}");
                return StageResult::Skipped {
                    reason: SkipReason::MissingCompanionData,
                };
            }
            Err(e) => return StageResult::failed(e.to_string()),
        };
        let metadata = match self.inputs.metadata.read(item).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("{position} Metadata unavailable for {}: {e}", item.name());
                Value::Object(Map::new())
            }
        };

        let user_content = json!({
            "sql": sql,
            "sql_info": sql_info,
            "metadata": metadata,
        })
        .to_string();
        let request = ChatRequest::json_review(
            &self.settings.model,
            &self.settings.system_prompt,
            user_content,
            self.settings.max_tokens,
            self.settings.temperature,
        );

        let policy = self.settings.processing_policy;
        let request = &request;
        let label = item.name();
        let live = Mutex::new(std::mem::take(trail));
        let states = &live;
        let outcome = retry::run(
            &policy,
            move |_| {
                states.lock().advance(State::Calling);
                async move {
                    self.round_trip(request, label)
                        .await
                        .map_err(Failure::Retryable)
                }
            },
            |attempt, err| {
                states.lock().advance(State::RetryWait);
                self.stats().record_processing_retry();
                warn!(
                    "{position} Processing retry {}/{} for {label}: {err}, retrying in {:.1}s...",
                    attempt.number,
                    policy.max_retries(),
                    attempt.delay.as_secs_f64()
                );
            },
        )
        .await;
        *trail = live.into_inner();

        match outcome {
            RetryOutcome::Succeeded { value, .. } => {
                let detail = SuccessDetail {
                    issue_count: value.issue_count(),
                    score: value.score(),
                    bypassed: false,
                };
                self.persist(item, &value.document, detail).await
            }
            RetryOutcome::Exhausted { error, .. } | RetryOutcome::Aborted { error, .. } => {
                StageResult::failed(error.to_string())
            }
        }
    }

    /// One call plus validation of its reply.
    async fn round_trip(
        &self,
        request: &ChatRequest,
        label: &str,
    ) -> Result<ParsedReview, ProcessingError> {
        let response = self.adapter.invoke(request, label).await?;
        if response.choices.is_empty() {
            return Err(ProcessingError::NoChoices);
        }
        let content = response
            .first_content()
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProcessingError::EmptyContent)?;
        parse_review(content)
    }

    async fn persist<D: Serialize + ?Sized>(
        &self,
        item: &WorkItem,
        document: &D,
        detail: SuccessDetail,
    ) -> StageResult {
        match self.sink.write(item.name(), document).await {
            Ok(WriteOutcome::Written(path)) => {
                debug!(item = item.name(), "saved review to {}", path.display());
                StageResult::Success { detail }
            }
            Ok(WriteOutcome::Duplicate) => StageResult::Skipped {
                reason: SkipReason::Duplicate,
            },
            Err(e) => StageResult::failed(e.to_string()),
        }
    }
}

impl<T: ChatTransport + 'static> StageWorker for ReviewWorkflow<T> {
    async fn process(&self, item: &WorkItem, position: Position) -> StageResult {
        self.review(item, position).await.0
    }
}
