//! Shared item loop for the batch-style entry points.

use crate::config::JobConfig;
use crate::output::ItemResult;
use crate::progress::{NoopProgress, ProgressCallback};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;

/// The configured progress callback, or a no-op one.
pub(crate) fn reporter(config: &JobConfig) -> ProgressCallback {
    config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgress))
}

/// Drive `op` over `items`, at most `concurrency` at a time.
///
/// With `concurrency == 1` each item is fully awaited before the next one
/// starts. Results come back in completion order; callers sort by index.
pub(crate) async fn run_items<T, F, Fut>(items: Vec<T>, concurrency: usize, op: F) -> Vec<ItemResult>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = ItemResult>,
{
    if concurrency <= 1 {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(op(item).await);
        }
        return results;
    }

    stream::iter(items.into_iter().map(op))
        .buffer_unordered(concurrency)
        .collect()
        .await
}
