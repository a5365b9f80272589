//! Progress-callback trait for per-item events.
//!
//! Inject an [`Arc<dyn ProgressReporter>`] via
//! [`crate::config::JobConfigBuilder::progress_callback`] to receive events
//! as the fetch job, batch downloader or watcher works through its list.
//!
//! # Example
//!
//! ```rust
//! use pib_pdfs::{JobConfig, ProgressReporter};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counting {
//!     saved: AtomicUsize,
//! }
//!
//! impl ProgressReporter for Counting {
//!     fn on_item_complete(&self, index: usize, total: usize, file_name: &str, bytes: u64) {
//!         self.saved.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {file_name} ({bytes} bytes)");
//!     }
//! }
//!
//! let config = JobConfig::builder()
//!     .progress_callback(Arc::new(Counting { saved: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called as a batch processes each item.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the item
/// methods may be called from several tasks at once. All methods default to
/// no-ops.
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first item, only when `total > 0`.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item's request is issued.
    ///
    /// # Arguments
    /// * `index` — 1-based position in the batch
    /// * `total` — batch size
    /// * `label` — human-readable item name (report title or URL)
    fn on_item_start(&self, index: usize, total: usize, label: &str) {
        let _ = (index, total, label);
    }

    /// Called when an item's PDF has been written.
    fn on_item_complete(&self, index: usize, total: usize, file_name: &str, bytes: u64) {
        let _ = (index, total, file_name, bytes);
    }

    /// Called when an item failed; the batch continues.
    fn on_item_error(&self, index: usize, total: usize, label: &str, error: &str) {
        let _ = (index, total, label, error);
    }

    /// Called once after all items were attempted, only when `total > 0`.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::config::JobConfig`].
pub type ProgressCallback = Arc<dyn ProgressReporter>;
