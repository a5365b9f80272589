//! Publication watcher: poll an index page and fetch PDFs it has not seen.
//!
//! State is a plain text record, one URL per line, sorted. A run with no
//! record (or an empty one) only takes stock: it saves what the page links to
//! and downloads nothing. Later runs download the difference and add each
//! link that landed to the record; failed links stay out so the next run
//! tries them again.

use crate::config::JobConfig;
use crate::error::{FetchError, ItemError};
use crate::output::{BatchOutput, FetchMethod, ItemResult};
use crate::pipeline::download::{build_client, download_to};
use crate::pipeline::input::parse_http_url;
use crate::pipeline::naming::{dedupe_against, link_file_name};
use crate::runner::{reporter, run_items};
use crate::webhook::{self, WebhookReport};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// What one watcher pass did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchOutput {
    /// True when this pass only recorded the current links.
    pub first_run: bool,
    /// PDF links found on the page.
    pub discovered: usize,
    /// Links not present in the record before this pass, sorted.
    pub new_links: Vec<String>,
    pub batch: BatchOutput,
    pub webhook: Option<WebhookReport>,
}

/// Every `<a href>` in `html` that points at a `.pdf`, resolved against `base`.
///
/// Only http(s) targets are kept. The result is sorted and free of duplicates.
pub fn extract_pdf_links(html: &str, base: &Url) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .filter(|url| url.path().to_ascii_lowercase().ends_with(".pdf"))
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .collect()
}

/// Read the seen-links record. A missing file is an empty record.
pub async fn load_seen(path: &Path) -> Result<BTreeSet<String>, FetchError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(e) => Err(FetchError::InvalidInputFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Replace the record with `links`, one per line in sorted order.
pub async fn save_seen(path: &Path, links: &BTreeSet<String>) -> Result<(), FetchError> {
    let write_err = |e: std::io::Error| FetchError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut text = String::new();
    for link in links {
        text.push_str(link);
        text.push('\n');
    }

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)
}

/// Run one watcher pass against `index_url`.
///
/// When `webhook_url` is set and something new was attempted, a summary of
/// the files downloaded in this pass is POSTed there.
pub async fn run_watch(
    index_url: &str,
    record_path: &Path,
    webhook_url: Option<&str>,
    config: &JobConfig,
) -> Result<WatchOutput, FetchError> {
    let base = parse_http_url(index_url)?;
    let client = build_client(config)?;

    let current = fetch_index(&client, &base, config).await?;
    let mut output = WatchOutput {
        first_run: false,
        discovered: current.len(),
        new_links: Vec::new(),
        batch: BatchOutput::default(),
        webhook: None,
    };

    if current.is_empty() {
        info!("No PDFs found on {index_url}");
        return Ok(output);
    }

    let mut seen = load_seen(record_path).await?;
    if seen.is_empty() {
        info!(
            "First run: recording {} links in {}, downloading nothing",
            current.len(),
            record_path.display()
        );
        save_seen(record_path, &current).await?;
        output.first_run = true;
        return Ok(output);
    }

    output.new_links = current.difference(&seen).cloned().collect();
    if output.new_links.is_empty() {
        info!("No new PDFs on {index_url}");
        return Ok(output);
    }
    info!("{} new PDFs on {index_url}", output.new_links.len());

    output.batch = download_links(&client, &output.new_links, config).await?;

    for item in output.batch.items.iter().filter(|i| i.is_success()) {
        seen.insert(item.url.clone());
    }
    save_seen(record_path, &seen).await?;

    if let Some(url) = webhook_url {
        let files: Vec<String> = output
            .batch
            .items
            .iter()
            .filter_map(ItemResult::file_name)
            .collect();
        let body = webhook::build_payload(
            config.run_id.as_deref(),
            Value::from(unix_now()),
            output.new_links.len() as u64,
            files,
        );
        output.webhook = Some(webhook::post(&client, url, &body, config.webhook_timeout_secs).await?);
    }

    Ok(output)
}

async fn fetch_index(
    client: &reqwest::Client,
    base: &Url,
    config: &JobConfig,
) -> Result<BTreeSet<String>, FetchError> {
    let fail = |reason: String| FetchError::IndexFetchFailed {
        url: base.to_string(),
        reason,
    };

    let mut request = client.get(base.clone());
    if let Some(secs) = config.download_timeout_secs {
        request = request.timeout(std::time::Duration::from_secs(secs));
    }
    let response = request.send().await.map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }
    let html = response.text().await.map_err(|e| fail(e.to_string()))?;

    let links = extract_pdf_links(&html, base);
    debug!("{} PDF links on {}", links.len(), base);
    Ok(links)
}

async fn download_links(
    client: &reqwest::Client,
    links: &[String],
    config: &JobConfig,
) -> Result<BatchOutput, FetchError> {
    let start = Instant::now();
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| FetchError::DirectoryFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    // Files from earlier passes stay put; a new link never overwrites one.
    let on_disk = existing_names(&config.output_dir).await?;
    let names = dedupe_against(
        links
            .iter()
            .enumerate()
            .map(|(i, url)| link_file_name(url, i + 1))
            .collect(),
        on_disk,
    );
    let progress = reporter(config);
    let total = links.len();
    progress.on_batch_start(total);

    let items: Vec<(usize, &str, String)> = links
        .iter()
        .zip(names)
        .enumerate()
        .map(|(i, (url, name))| (i + 1, url.as_str(), name))
        .collect();

    let progress = &progress;
    let results = run_items(items, config.concurrency, move |(index, url, name)| async move {
        let item_start = Instant::now();
        progress.on_item_start(index, total, url);
        let dest = config.output_dir.join(&name);
        let outcome: Result<(u64, bool), ItemError> =
            download_to(client, index, url, &dest, config.download_timeout_secs).await;
        let duration_ms = item_start.elapsed().as_millis() as u64;

        match outcome {
            Ok((bytes, _)) => {
                info!("Downloaded {url} → {name} ({bytes} bytes)");
                progress.on_item_complete(index, total, &name, bytes);
                ItemResult {
                    index,
                    label: url.to_string(),
                    url: url.to_string(),
                    path: Some(dest),
                    bytes,
                    duration_ms,
                    method: Some(FetchMethod::Downloaded),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Failed to download {url}: {e}");
                progress.on_item_error(index, total, url, &e.to_string());
                ItemResult::failed(index, url, url, e, duration_ms)
            }
        }
    })
    .await;

    let batch = BatchOutput::from_items(results, start.elapsed().as_millis() as u64);
    progress.on_batch_complete(batch.stats.total, batch.stats.succeeded);
    Ok(batch)
}

/// Names of the entries already in `dir`.
async fn existing_names(dir: &Path) -> Result<HashSet<String>, FetchError> {
    let dir_err = |e: std::io::Error| FetchError::DirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(dir_err)?;
    let mut names = HashSet::new();
    while let Some(entry) = entries.next_entry().await.map_err(dir_err)? {
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
