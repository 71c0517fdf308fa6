//! Runs deferred diff tasks to completion.
//!
//! Tasks submit children through a [`TaskSpawner`] while they run, so the
//! task set grows as the traversal descends. A run finishes when nothing is
//! in flight and nothing is queued.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, trace, warn};

use crate::context::DiffContext;
use crate::deferred::DeferredDiffEntry;
use crate::error::{DiffError, DiffResult};

/// Counters for one diff run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub tasks_spawned: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    /// Queued tasks discarded because the run was cancelled.
    pub tasks_dropped: u64,
}

/// Submission handle held by the run context.
#[derive(Clone, Debug)]
pub(crate) struct TaskSpawner {
    tx: mpsc::UnboundedSender<DeferredDiffEntry>,
}

impl TaskSpawner {
    pub(crate) fn submit(&self, entry: DeferredDiffEntry) {
        if let Err(rejected) = self.tx.send(entry) {
            trace!(path = %rejected.0.path(), "scheduler closed, dropping task");
        }
    }
}

pub(crate) struct TaskQueue {
    rx: mpsc::UnboundedReceiver<DeferredDiffEntry>,
}

pub(crate) fn channel() -> (TaskSpawner, TaskQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskSpawner { tx }, TaskQueue { rx })
}

/// Drive every task submitted to `queue` until the run completes.
///
/// A failed task does not stop its siblings: independent work already
/// submitted still runs, and the first failure is returned at the end.
/// Cancellation drops whatever is still queued, waits for in-flight tasks and
/// returns [`DiffError::Cancelled`].
pub(crate) async fn run(ctx: Arc<DiffContext>, mut queue: TaskQueue) -> DiffResult<DiffStats> {
    let cancel = ctx.cancel_token().clone();
    let mut tasks: JoinSet<DiffResult<()>> = JoinSet::new();
    let mut stats = DiffStats::default();
    let mut first_error: Option<DiffError> = None;
    let mut cancelled = false;

    loop {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        while let Ok(entry) = queue.rx.try_recv() {
            spawn(&mut tasks, &ctx, entry, &mut stats);
        }
        if tasks.is_empty() {
            break;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            Some(joined) = tasks.join_next() => record(joined, &mut stats, &mut first_error),
            Some(entry) = queue.rx.recv() => spawn(&mut tasks, &ctx, entry, &mut stats),
        }
    }

    if cancelled {
        queue.rx.close();
        while let Ok(entry) = queue.rx.try_recv() {
            trace!(path = %entry.path(), "dropping queued task");
            stats.tasks_dropped += 1;
        }
        while let Some(joined) = tasks.join_next().await {
            record(joined, &mut stats, &mut first_error);
        }
        debug!(?stats, "diff cancelled");
        return Err(DiffError::Cancelled);
    }

    debug!(?stats, "diff finished");
    match first_error {
        Some(err) => Err(err),
        None => Ok(stats),
    }
}

fn spawn(
    tasks: &mut JoinSet<DiffResult<()>>,
    ctx: &Arc<DiffContext>,
    entry: DeferredDiffEntry,
    stats: &mut DiffStats,
) {
    stats.tasks_spawned += 1;
    let ctx = Arc::clone(ctx);
    tasks.spawn(async move {
        let path = entry.path().clone();
        let kind = entry.kind();
        let result = entry.run(ctx).await;
        if let Err(err) = &result {
            debug!(path = %path, kind, error = %err, "diff task failed");
        }
        result
    });
}

fn record(
    joined: Result<DiffResult<()>, JoinError>,
    stats: &mut DiffStats,
    first_error: &mut Option<DiffError>,
) {
    let err = match joined {
        Ok(Ok(())) => {
            stats.tasks_completed += 1;
            return;
        }
        Ok(Err(err)) => err,
        Err(join_err) if join_err.is_panic() => DiffError::TaskPanicked(join_err.to_string()),
        Err(_) => DiffError::Cancelled,
    };
    stats.tasks_failed += 1;
    if first_error.is_none() {
        warn!(error = %err, "diff run failing");
        *first_error = Some(err);
    }
}
