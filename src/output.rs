//! Result types returned by the batch-style entry points.

use crate::artifact::ArtifactReport;
use crate::error::ItemError;
use crate::webhook::WebhookReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How an item's PDF was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchMethod {
    /// Response body saved as-is.
    Downloaded,
    /// Page printed through the headless browser.
    Rendered,
}

/// The outcome of one URL or report record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    /// 1-based position in the input list.
    pub index: usize,
    /// Report title, or the URL when there is no title.
    pub label: String,
    pub url: String,
    /// Where the PDF landed; `None` on failure.
    pub path: Option<PathBuf>,
    pub bytes: u64,
    pub duration_ms: u64,
    pub method: Option<FetchMethod>,
    pub error: Option<ItemError>,
}

impl ItemResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.path.is_some()
    }

    /// File name of the written PDF, if any.
    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub(crate) fn failed(index: usize, label: &str, url: &str, error: ItemError, duration_ms: u64) -> Self {
        Self {
            index,
            label: label.to_string(),
            url: url.to_string(),
            path: None,
            bytes: 0,
            duration_ms,
            method: None,
            error: Some(error),
        }
    }
}

/// Aggregate numbers for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_bytes: u64,
    pub duration_ms: u64,
}

/// Every item result of a batch, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    pub items: Vec<ItemResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    pub(crate) fn from_items(mut items: Vec<ItemResult>, duration_ms: u64) -> Self {
        items.sort_by_key(|i| i.index);
        let succeeded = items.iter().filter(|i| i.is_success()).count();
        let stats = BatchStats {
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
            total_bytes: items.iter().map(|i| i.bytes).sum(),
            duration_ms,
        };
        Self { items, stats }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|i| !i.is_success())
    }
}

/// Everything the trigger-driven job did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutput {
    pub batch: BatchOutput,
    pub artifact: ArtifactReport,
    /// `None` when the job ran with webhook delivery disabled.
    pub webhook: Option<WebhookReport>,
}
