//! Bounded fan-out of work items over a pool of tokio tasks.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tokio::task::JoinError;
use tracing::{error, info};
use uuid::Uuid;

use crate::items::WorkItem;
use crate::outcome::StageResult;
use crate::stats::{StatsAggregator, StatsSnapshot};

/// 1-based position of an item within its run, for log prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub total: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.index, self.total)
    }
}

/// Processes one work item to its final result.
///
/// Implementations own all per-item state; anything shared between items must
/// be synchronized by the implementation itself.
pub trait StageWorker: Send + Sync + 'static {
    fn process(
        &self,
        item: &WorkItem,
        position: Position,
    ) -> impl Future<Output = StageResult> + Send;
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub name: String,
    pub result: StageResult,
}

/// Everything a finished stage run produced.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub run_id: Uuid,
    pub snapshot: StatsSnapshot,
    /// In completion order.
    pub results: Vec<ItemReport>,
}

impl StageReport {
    /// Failed items with their reasons, in completion order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|r| match &r.result {
            StageResult::Failed { reason } => Some((r.name.as_str(), reason.as_str())),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn result_for(&self, name: &str) -> Option<&StageResult> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.result)
    }
}

pub struct StageExecutor {
    worker_count: usize,
    stats: Arc<StatsAggregator>,
    progress: ProgressBar,
}

impl StageExecutor {
    /// `worker_count` is clamped to at least one.
    pub fn new(worker_count: usize, stats: Arc<StatsAggregator>) -> Self {
        Self {
            worker_count: worker_count.max(1),
            stats,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    #[cfg(test)]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs `worker` over every item with at most `worker_count` in flight and
    /// waits for all of them.
    ///
    /// Tasks are spawned lazily as slots free up. A task that panics yields
    /// `Failed` for its own item only.
    pub async fn run<W: StageWorker>(&self, worker: Arc<W>, items: Vec<WorkItem>) -> StageReport {
        let run_id = Uuid::new_v4();
        let total = items.len();
        let started = Instant::now();
        self.stats.begin_run(total);
        self.progress.set_length(total as u64);
        info!(%run_id, items = total, workers = self.worker_count, "Starting stage run");

        let mut completions = stream::iter(items.into_iter().enumerate())
            .map(|(i, item)| {
                let worker = Arc::clone(&worker);
                let name = item.name().to_string();
                let position = Position {
                    index: i + 1,
                    total,
                };
                let handle = tokio::spawn(async move { worker.process(&item, position).await });
                async move { (name, handle.await) }
            })
            .buffer_unordered(self.worker_count);

        let mut results = Vec::with_capacity(total);
        while let Some((name, joined)) = completions.next().await {
            let result = joined.unwrap_or_else(|e| {
                let reason = fault_reason(e);
                error!(item = %name, "Unexpected worker fault: {reason}");
                StageResult::failed(reason)
            });
            self.stats.record_outcome(&result);
            self.progress.set_message(name.clone());
            self.progress.inc(1);
            results.push(ItemReport { name, result });
        }

        self.stats.finish(started.elapsed());
        self.progress.finish_and_clear();

        let snapshot = self.stats.snapshot();
        debug_assert_eq!(snapshot.completed(), snapshot.total_items);
        StageReport {
            run_id,
            snapshot,
            results,
        }
    }
}

fn fault_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("worker task cancelled: {err}");
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("worker panicked: {message}")
}
