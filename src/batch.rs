//! Batch downloader: a JSON list of `{title, pdfUrl}` records → `report_<n>.pdf`.
//!
//! Records are worked through in order. A record that fails is logged with its
//! title and skipped; nothing is retried and nothing is left behind for it.
//! Titles are only ever used for log lines, never for file names.

use crate::config::JobConfig;
use crate::error::{FetchError, ItemError};
use crate::output::{BatchOutput, FetchMethod, ItemResult};
use crate::payload::ReportRecord;
use crate::pipeline::download::{build_client, download_to};
use crate::pipeline::input::{load_reports, parse_http_url};
use crate::pipeline::naming::report_file_name;
use crate::runner::{reporter, run_items};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Load the report list at `path` and download every record.
///
/// The file is parsed completely before the first request; a malformed file
/// returns [`FetchError::InvalidInputFile`] with nothing downloaded.
pub async fn download_reports_from_file(
    path: &Path,
    config: &JobConfig,
) -> Result<BatchOutput, FetchError> {
    let records = load_reports(path).await?;
    download_reports(&records, config).await
}

/// Download `records` into `config.output_dir` as `report_1.pdf`, `report_2.pdf`, …
///
/// An empty list returns immediately: no directory, no requests, no logs.
pub async fn download_reports(
    records: &[ReportRecord],
    config: &JobConfig,
) -> Result<BatchOutput, FetchError> {
    if records.is_empty() {
        return Ok(BatchOutput::default());
    }

    let start = Instant::now();
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| FetchError::DirectoryFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    let client = build_client(config)?;
    let progress = reporter(config);
    let total = records.len();
    progress.on_batch_start(total);

    let items: Vec<(usize, &ReportRecord)> =
        records.iter().enumerate().map(|(i, r)| (i + 1, r)).collect();

    let client = &client;
    let progress = &progress;
    let results = run_items(items, config.concurrency, move |(index, record)| async move {
        let item_start = Instant::now();
        progress.on_item_start(index, total, &record.title);

        let name = report_file_name(index);
        let dest = config.output_dir.join(&name);
        let outcome = match parse_http_url(&record.pdf_url) {
            Ok(_) => {
                download_to(client, index, &record.pdf_url, &dest, config.download_timeout_secs)
                    .await
            }
            Err(_) => Err(ItemError::InvalidUrl {
                index,
                url: record.pdf_url.clone(),
            }),
        };
        let duration_ms = item_start.elapsed().as_millis() as u64;

        match outcome {
            Ok((bytes, looks_like_pdf)) => {
                if !looks_like_pdf {
                    warn!("Report {index} '{}' does not look like a PDF", record.title);
                }
                info!("Downloaded report {index} '{}' → {name} ({bytes} bytes)", record.title);
                progress.on_item_complete(index, total, &name, bytes);
                ItemResult {
                    index,
                    label: record.title.clone(),
                    url: record.pdf_url.clone(),
                    path: Some(dest),
                    bytes,
                    duration_ms,
                    method: Some(FetchMethod::Downloaded),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Failed to download report {index} '{}': {e}", record.title);
                progress.on_item_error(index, total, &record.title, &e.to_string());
                ItemResult::failed(index, &record.title, &record.pdf_url, e, duration_ms)
            }
        }
    })
    .await;

    let batch = BatchOutput::from_items(results, start.elapsed().as_millis() as u64);
    progress.on_batch_complete(batch.stats.total, batch.stats.succeeded);
    info!(
        "Downloaded {}/{} reports into {}",
        batch.stats.succeeded,
        batch.stats.total,
        config.output_dir.display()
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_list_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let config = JobConfig::builder().output_dir(&out).build().unwrap();
        let batch = download_reports(&[], &config).await.unwrap();
        assert!(batch.items.is_empty());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn malformed_file_fails_before_any_download() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("reports.json");
        std::fs::write(&list, r#"[{"title":"Q1","pdfUrl":"https://x/q1.pdf"},"#).unwrap();
        let out = dir.path().join("out");
        let config = JobConfig::builder().output_dir(&out).build().unwrap();

        let err = download_reports_from_file(&list, &config).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidInputFile { .. }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig::builder().output_dir(dir.path()).build().unwrap();
        let err = download_reports_from_file(&dir.path().join("nope.json"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_http_url_is_an_item_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig::builder().output_dir(dir.path()).build().unwrap();
        let records = vec![ReportRecord {
            title: "Local".into(),
            pdf_url: "file:///etc/hosts".into(),
        }];
        let batch = download_reports(&records, &config).await.unwrap();
        assert_eq!(batch.stats.failed, 1);
        assert!(matches!(
            batch.items[0].error,
            Some(ItemError::InvalidUrl { index: 1, .. })
        ));
        assert!(!dir.path().join("report_1.pdf").exists());
    }
}
