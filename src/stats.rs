//! Run statistics shared by concurrently completing workers.
//!
//! Every mutation takes the lock for a handful of additions and releases it;
//! nothing holds it across a network call or a sleep.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::outcome::{SkipReason, StageResult};

/// Token accounting figures reported by the API for one call, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
    pub reasoning: u64,
    pub cached: u64,
}

impl TokenUsage {
    fn add(&mut self, other: &TokenUsage) {
        self.prompt += other.prompt;
        self.completion += other.completion;
        self.total += other.total;
        self.reasoning += other.reasoning;
        self.cached += other.cached;
    }
}

#[derive(Debug, Default)]
struct Counters {
    total_items: u64,
    successful: u64,
    bypassed: u64,
    skipped: u64,
    duplicates: u64,
    failed: u64,
    transport_retries: u64,
    processing_retries: u64,
    tokens: TokenUsage,
    elapsed: Duration,
}

/// Thread-safe counters for one stage run.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    inner: Mutex<Counters>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets outcome counters and records how many items the run dispatches.
    pub fn begin_run(&self, total_items: usize) {
        let mut c = self.inner.lock();
        *c = Counters {
            total_items: total_items as u64,
            ..Counters::default()
        };
    }

    pub fn record_outcome(&self, result: &StageResult) {
        let mut c = self.inner.lock();
        match result {
            StageResult::Success { detail } => {
                c.successful += 1;
                if detail.bypassed {
                    c.bypassed += 1;
                }
            }
            StageResult::Skipped { reason } => {
                c.skipped += 1;
                if *reason == SkipReason::Duplicate {
                    c.duplicates += 1;
                }
            }
            StageResult::Failed { .. } => c.failed += 1,
        }
    }

    pub fn record_transport_retry(&self) {
        self.inner.lock().transport_retries += 1;
    }

    pub fn record_processing_retry(&self) {
        self.inner.lock().processing_retries += 1;
    }

    pub fn record_usage(&self, usage: &TokenUsage) {
        self.inner.lock().tokens.add(usage);
    }

    pub fn finish(&self, elapsed: Duration) {
        self.inner.lock().elapsed = elapsed;
    }

    /// Copies every counter under one lock acquisition.
    pub fn snapshot(&self) -> StatsSnapshot {
        let c = self.inner.lock();
        StatsSnapshot {
            total_items: c.total_items,
            successful: c.successful,
            bypassed: c.bypassed,
            skipped: c.skipped,
            duplicates: c.duplicates,
            failed: c.failed,
            transport_retries: c.transport_retries,
            processing_retries: c.processing_retries,
            total_retries: c.transport_retries + c.processing_retries,
            tokens: c.tokens,
            elapsed_secs: c.elapsed.as_secs_f64(),
        }
    }
}

/// Immutable copy of the counters, taken once all workers are done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_items: u64,
    pub successful: u64,
    pub bypassed: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub transport_retries: u64,
    pub processing_retries: u64,
    pub total_retries: u64,
    pub tokens: TokenUsage,
    pub elapsed_secs: f64,
}

impl StatsSnapshot {
    pub fn completed(&self) -> u64 {
        self.successful + self.skipped + self.failed
    }

    /// Tokens the API actually had to process: uncached prompt plus completion.
    pub fn effective_tokens(&self) -> u64 {
        self.tokens.prompt.saturating_sub(self.tokens.cached) + self.tokens.completion
    }

    /// Cached share of prompt tokens, in percent.
    pub fn cache_hit_rate(&self) -> Option<f64> {
        percent(self.tokens.cached, self.tokens.prompt)
    }

    /// Successful share of all items, in percent.
    pub fn success_rate(&self) -> Option<f64> {
        percent(self.successful, self.total_items)
    }
}

fn percent(part: u64, whole: u64) -> Option<f64> {
    (whole > 0).then(|| part as f64 * 100.0 / whole as f64)
}
