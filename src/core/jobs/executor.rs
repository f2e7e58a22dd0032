//! Chunked batch executor
//!
//! Drives an ordered list of work items through a per-item async
//! operation with bounded parallelism, fine-grained progress publication,
//! and cooperative cancellation at chunk boundaries.
//!
//! Chunked-wait-then-advance was chosen over a continuously refilled
//! worker pool: the concurrency ceiling against the rate-limited
//! downstream is provable, and the gap between chunks is a well-defined
//! cancellation checkpoint.

use async_trait::async_trait;
use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Executor tuning
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Items dispatched concurrently per chunk; must be at least 1
    pub concurrency: usize,
    /// Pause between chunks, independent of per-item retry backoff
    pub chunk_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            chunk_delay: Duration::from_secs(1),
        }
    }
}

/// Final disposition of a batch run
///
/// The executor never decides "failed": systemic failures are the
/// caller's responsibility to detect and convert into a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// All items were attempted
    Completed(usize),
    /// Cancellation was honored at a chunk boundary; carries the count
    /// processed before stopping
    Cancelled(usize),
}

impl Disposition {
    /// Items attempted regardless of how the run ended
    pub fn processed(&self) -> usize {
        match self {
            Disposition::Completed(n) | Disposition::Cancelled(n) => *n,
        }
    }
}

/// Receives a progress update after every individual item completes
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, processed: usize, total: usize);
}

/// Polled between chunks; `true` stops dispatching further chunks
#[async_trait]
pub trait CancelProbe: Send + Sync {
    async fn is_cancelled(&self) -> bool;
}

/// A probe that never cancels
pub struct NeverCancel;

#[async_trait]
impl CancelProbe for NeverCancel {
    async fn is_cancelled(&self) -> bool {
        false
    }
}

/// Run `op` over `items` in chunks of `options.concurrency`.
///
/// Within a chunk all operations are dispatched concurrently and the
/// whole chunk is awaited before the next one starts. Items already in
/// flight when cancellation is observed finish normally. Per-item
/// fallibility is the operation's own concern; the executor only counts
/// attempts.
///
/// The shared `processed` counter assumes a single executing worker per
/// job (the active-slot lock guarantees that); it is not a cross-process
/// atomic.
pub async fn run_chunked<T, Op, Fut>(
    items: Vec<T>,
    options: &BatchOptions,
    op: Op,
    sink: &dyn ProgressSink,
    probe: &dyn CancelProbe,
) -> Disposition
where
    T: Send,
    Op: Fn(T) -> Fut + Sync,
    Fut: Future<Output = ()> + Send,
{
    let total = items.len();
    let concurrency = options.concurrency.max(1);
    let chunk_count = total.div_ceil(concurrency);
    let processed = AtomicUsize::new(0);

    debug!(total, concurrency, chunk_count, "starting chunked batch run");

    let mut items = items.into_iter();
    for chunk_index in 0..chunk_count {
        let chunk: Vec<T> = items.by_ref().take(concurrency).collect();

        let futures = chunk.into_iter().map(|item| {
            let op = &op;
            let processed = &processed;
            async move {
                op(item).await;
                let count = processed.fetch_add(1, Ordering::SeqCst) + 1;
                sink.publish(count, total).await;
            }
        });
        join_all(futures).await;

        if probe.is_cancelled().await {
            let count = processed.load(Ordering::SeqCst);
            debug!(chunk_index, count, "batch run cancelled at chunk boundary");
            return Disposition::Cancelled(count);
        }

        let more_chunks_remain = chunk_index + 1 < chunk_count;
        if more_chunks_remain && !options.chunk_delay.is_zero() {
            tokio::time::sleep(options.chunk_delay).await;
        }
    }

    Disposition::Completed(processed.load(Ordering::SeqCst))
}
