//! Error types for the pib-pdfs library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FetchError`] — **Fatal**: the run cannot proceed at all (unreadable
//!   payload, malformed report list, no browser, webhook unreachable).
//!   Returned as `Err(FetchError)` from the top-level entry points.
//!
//! * [`ItemError`] — **Non-fatal**: a single URL or report failed (bad
//!   status, render crash, timeout) but the batch carries on. Stored inside
//!   [`crate::output::ItemResult`] so callers see exactly which items failed.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pib-pdfs library.
///
/// Per-item failures use [`ItemError`] and are stored in
/// [`crate::output::ItemResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum FetchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Payload or report file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Payload or report file exists but is not the expected JSON shape.
    #[error("Malformed input file '{path}': {detail}")]
    InvalidInputFile { path: PathBuf, detail: String },

    /// Trigger payload was syntactically valid JSON but unusable.
    #[error("Invalid trigger payload: {0}")]
    InvalidPayload(String),

    /// A URL that must be valid for the run to make sense is not.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // ── Tooling errors ────────────────────────────────────────────────────
    /// No headless browser could be located for rendering.
    #[error("Headless browser unavailable: {0}")]
    BrowserUnavailable(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or prepare a directory.
    #[error("Failed to prepare directory '{path}': {source}")]
    DirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact publication found no files and the policy says to fail.
    #[error("No files found for artifact '{name}' in '{path}'")]
    EmptyArtifact { name: String, path: PathBuf },

    // ── Network errors ────────────────────────────────────────────────────
    /// The webhook POST never got a response.
    #[error("Webhook delivery to '{url}' failed: {reason}")]
    WebhookFailed { url: String, reason: String },

    /// The watcher could not load its index page.
    #[error("Failed to fetch index page '{url}': {reason}")]
    IndexFetchFailed { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    HttpClient(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single item.
///
/// Stored alongside [`crate::output::ItemResult`] when an item fails.
/// The run continues with the next item regardless.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The item's URL is not an absolute http(s) URL.
    #[error("Item {index}: invalid URL '{url}'")]
    InvalidUrl { index: usize, url: String },

    /// The HTTP request failed or returned a non-success status.
    #[error("Item {index}: download of '{url}' failed: {detail}")]
    DownloadFailed {
        index: usize,
        url: String,
        detail: String,
    },

    /// The browser exited without producing a PDF.
    #[error("Item {index}: rendering '{url}' failed: {detail}")]
    RenderFailed {
        index: usize,
        url: String,
        detail: String,
    },

    /// The download or render exceeded its time budget.
    #[error("Item {index}: '{url}' timed out after {secs}s")]
    Timeout { index: usize, url: String, secs: u64 },

    /// Bytes arrived but could not be written to disk.
    #[error("Item {index}: could not write '{path}': {detail}")]
    WriteFailed {
        index: usize,
        path: String,
        detail: String,
    },
}

impl ItemError {
    /// 1-based position of the failed item in its batch.
    pub fn index(&self) -> usize {
        match self {
            ItemError::InvalidUrl { index, .. }
            | ItemError::DownloadFailed { index, .. }
            | ItemError::RenderFailed { index, .. }
            | ItemError::Timeout { index, .. }
            | ItemError::WriteFailed { index, .. } => *index,
        }
    }
}
