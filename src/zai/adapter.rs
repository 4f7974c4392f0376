//! Transport-level retry around a [`ChatTransport`].
//!
//! Timeouts, connection faults and non-2xx replies are retried here under the
//! adapter's own [`RetryPolicy`]; everything else is handed back to the caller
//! after the first attempt. Every successful round trip records its token
//! usage into the shared [`StatsAggregator`].

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::ChatTransport;
use super::error::TransportError;
use super::types::{ChatRequest, ChatResponse};
use crate::retry::{self, Failure, RetryOutcome, RetryPolicy};
use crate::stats::StatsAggregator;

pub struct CallAdapter<T> {
    transport: T,
    policy: RetryPolicy,
    stats: Arc<StatsAggregator>,
}

impl<T: ChatTransport> CallAdapter<T> {
    pub fn new(transport: T, policy: RetryPolicy, stats: Arc<StatsAggregator>) -> Self {
        Self {
            transport,
            policy,
            stats,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    /// Send `req`, retrying transport faults. `label` names the item in logs.
    pub async fn invoke(
        &self,
        req: &ChatRequest,
        label: &str,
    ) -> Result<ChatResponse, TransportError> {
        let policy = self.policy;
        let outcome = retry::run(
            &policy,
            move |attempt| async move {
                debug!(
                    item = label,
                    attempt = attempt.number,
                    max = policy.max_attempts,
                    "calling API"
                );
                match self.transport.post(req).await {
                    Ok(resp) => {
                        let usage = resp.usage.figures();
                        self.stats.record_usage(&usage);
                        debug!(
                            item = label,
                            prompt = usage.prompt,
                            completion = usage.completion,
                            total = usage.total,
                            reasoning = usage.reasoning,
                            cached = usage.cached,
                            "API call succeeded"
                        );
                        Ok(resp)
                    }
                    Err(e) if e.is_retryable() => Err(Failure::Retryable(e)),
                    Err(e) => Err(Failure::Terminal(e)),
                }
            },
            |attempt, err| {
                self.stats.record_transport_retry();
                warn!(
                    item = label,
                    attempt = attempt.number,
                    failure = ?attempt.failure,
                    delay_ms = attempt.delay.as_millis() as u64,
                    "API call failed: {err}; retrying"
                );
            },
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Exhausted { error, attempts } => {
                error!(
                    item = label,
                    attempts,
                    "API call failed after all retries: {error}"
                );
                Err(error)
            }
            RetryOutcome::Aborted { error, .. } => {
                error!(item = label, "API call failed: {error}");
                Err(error)
            }
        }
    }
}
