//! # pib-pdfs
//!
//! Collect government press releases and reports as PDF files, bundle them,
//! and tell an automation service what was collected.
//!
//! Three entry points share one configuration type ([`JobConfig`]) and one
//! result type per item ([`ItemResult`]):
//!
//! * **Fetch job** ([`run_job`]): a trigger payload lists page URLs and a
//!   webhook. Each page becomes a PDF (printed through headless Chrome, or
//!   saved directly when the server already serves a PDF), the output
//!   directory is published as an artifact, and a summary of the directory
//!   is POSTed to the webhook.
//! * **Batch downloader** ([`download_reports_from_file`]): a JSON list of
//!   `{title, pdfUrl}` records becomes `report_1.pdf`, `report_2.pdf`, …
//! * **Watcher** ([`run_watch`]): an index page is polled for PDF links that
//!   have not been seen before, and only those are downloaded.
//!
//! ## Pipeline Overview
//!
//! ```text
//! trigger payload
//!  │
//!  ├─ 1. Input     parse the payload, validate every URL
//!  ├─ 2. Naming    pib_<PRID>.pdf / page_<n>.pdf, decided up front
//!  ├─ 3. Convert   GET + sniff, else print via headless browser
//!  ├─ 4. Artifact  copy the directory to <artifact_root>/<name>/
//!  └─ 5. Webhook   POST {metadata, details} built from the directory listing
//! ```
//!
//! A single bad URL never stops a run; it shows up as an [`ItemError`] in its
//! [`ItemResult`]. Run-level problems are [`FetchError`]s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pib_pdfs::{run_job, JobConfig, TriggerPayload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let payload = TriggerPayload::from_json_str(
//!         r#"{"links":["https://pib.gov.in/PressReleasePage.aspx?PRID=2100000"],
//!             "n8n_webhook":"https://n8n.example.org/webhook/pib",
//!             "timestamp":"2025-06-01T10:00:00Z","count":1}"#,
//!     )?;
//!     let config = JobConfig::builder().output_dir("pdfs").build()?;
//!     let output = run_job(&payload, &config).await?;
//!     eprintln!("{}/{} PDFs", output.batch.stats.succeeded, output.batch.stats.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pib-pdfs` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pib-pdfs = { version = "0.3", default-features = false }
//! ```
//!
//! ## Browser
//!
//! Printing needs a Chromium-family browser. It is located by the
//! `browser-auto` workspace crate: `PIB_CHROME_PATH` first, then the cache
//! directory, then `PATH` and the usual install locations.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod batch;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod payload;
pub mod pipeline;
pub mod progress;
mod runner;
pub mod watch;
pub mod webhook;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{publish, ArtifactReport};
pub use batch::{download_reports, download_reports_from_file};
pub use config::{ConversionMode, IfNoFilesFound, JobConfig, JobConfigBuilder, DEFAULT_ARTIFACT_NAME};
pub use error::{FetchError, ItemError};
pub use fetch::{convert_links, run_job, run_job_without_webhook};
pub use output::{BatchOutput, BatchStats, FetchMethod, FetchOutput, ItemResult};
pub use payload::{ReportRecord, TriggerPayload, WebhookDetail, WebhookMetadata, WebhookPayload};
pub use pipeline::render::{ChromeRenderer, PdfRenderer, PrintLayout, RenderFailure};
pub use progress::{NoopProgress, ProgressCallback, ProgressReporter};
pub use watch::{run_watch, WatchOutput};
pub use webhook::WebhookReport;
