//! Trigger-driven fetch job: links → PDFs → artifact → webhook.
//!
//! Each link is handled on its own; a failure is recorded in that link's
//! [`ItemResult`] and the job moves on. Only run-level problems (no output
//! directory, no browser in `Render` mode, webhook unreachable) end the job
//! with a [`FetchError`].

use crate::artifact;
use crate::config::{ConversionMode, JobConfig};
use crate::error::{FetchError, ItemError};
use crate::output::{BatchOutput, FetchMethod, FetchOutput, ItemResult};
use crate::payload::TriggerPayload;
use crate::pipeline::download::{build_client, download_to, probe, write_atomic, Probe};
use crate::pipeline::input::parse_http_url;
use crate::pipeline::naming::{dedupe, page_file_name};
use crate::pipeline::render::{ChromeRenderer, PdfRenderer, RenderFailure};
use crate::progress::ProgressCallback;
use crate::runner::{reporter, run_items};
use crate::webhook;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the whole job for one trigger payload.
///
/// Converts every link into `config.output_dir`, publishes the directory as
/// an artifact, then POSTs the directory summary to `trigger.n8n_webhook`.
///
/// # Errors
/// Per-link failures never surface here. A webhook that cannot be reached
/// at all does, after the artifact has been published.
pub async fn run_job(trigger: &TriggerPayload, config: &JobConfig) -> Result<FetchOutput, FetchError> {
    let client = build_client(config)?;
    let (batch, artifact) = convert_and_publish(&client, trigger, config).await?;
    let webhook = webhook::report(&client, &config.output_dir, trigger, config).await?;
    Ok(FetchOutput {
        batch,
        artifact,
        webhook: Some(webhook),
    })
}

/// Same as [`run_job`] without the webhook POST.
pub async fn run_job_without_webhook(
    trigger: &TriggerPayload,
    config: &JobConfig,
) -> Result<FetchOutput, FetchError> {
    let client = build_client(config)?;
    let (batch, artifact) = convert_and_publish(&client, trigger, config).await?;
    Ok(FetchOutput {
        batch,
        artifact,
        webhook: None,
    })
}

async fn convert_and_publish(
    client: &reqwest::Client,
    trigger: &TriggerPayload,
    config: &JobConfig,
) -> Result<(BatchOutput, artifact::ArtifactReport), FetchError> {
    info!(
        "Fetch job: {} links (declared count {})",
        trigger.links.len(),
        trigger.declared_count()
    );
    let batch = convert_links(client, &trigger.links, config).await?;
    let artifact = artifact::publish(&config.output_dir, config).await?;
    Ok((batch, artifact))
}

/// Convert `links` into PDFs inside `config.output_dir`.
///
/// Output names are `pib_<PRID>.pdf` (or `page_<n>.pdf`), fixed before any
/// request is made.
pub async fn convert_links(
    client: &reqwest::Client,
    links: &[String],
    config: &JobConfig,
) -> Result<BatchOutput, FetchError> {
    if links.is_empty() {
        return Ok(BatchOutput::default());
    }

    let start = Instant::now();
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| FetchError::DirectoryFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    let renderer = resolve_renderer(config)?;
    let names = dedupe(
        links
            .iter()
            .enumerate()
            .map(|(i, url)| page_file_name(url, i + 1))
            .collect(),
    );

    let ctx = Ctx {
        client,
        config,
        renderer,
        progress: reporter(config),
        total: links.len(),
    };

    ctx.progress.on_batch_start(ctx.total);

    let items: Vec<(usize, &str, String)> = links
        .iter()
        .zip(names)
        .enumerate()
        .map(|(i, (url, name))| (i + 1, url.as_str(), name))
        .collect();

    let ctx = &ctx;
    let results = run_items(items, config.concurrency, move |(index, url, name)| {
        ctx.convert_one(index, url, name)
    })
    .await;

    let batch = BatchOutput::from_items(results, start.elapsed().as_millis() as u64);
    ctx.progress
        .on_batch_complete(batch.stats.total, batch.stats.succeeded);

    info!(
        "Converted {}/{} links in {}ms ({} bytes)",
        batch.stats.succeeded, batch.stats.total, batch.stats.duration_ms, batch.stats.total_bytes
    );
    Ok(batch)
}

/// Pick the renderer for a run.
///
/// A renderer set on the config always wins. Otherwise `Render` mode needs a
/// browser up front, `Auto` mode makes do without one (non-PDF pages then
/// fail individually), and `Download` mode never renders.
fn resolve_renderer(config: &JobConfig) -> Result<Option<Arc<dyn PdfRenderer>>, FetchError> {
    if let Some(ref renderer) = config.renderer {
        return Ok(Some(Arc::clone(renderer)));
    }

    match config.conversion_mode {
        ConversionMode::Download => Ok(None),
        ConversionMode::Render => {
            let chrome = ChromeRenderer::from_config(config)?;
            Ok(Some(Arc::new(chrome)))
        }
        ConversionMode::Auto => match ChromeRenderer::from_config(config) {
            Ok(chrome) => Ok(Some(Arc::new(chrome))),
            Err(e) => {
                warn!("{e}; only links that serve a PDF directly can succeed");
                Ok(None)
            }
        },
    }
}

struct Ctx<'a> {
    client: &'a reqwest::Client,
    config: &'a JobConfig,
    renderer: Option<Arc<dyn PdfRenderer>>,
    progress: ProgressCallback,
    total: usize,
}

impl Ctx<'_> {
    async fn convert_one(&self, index: usize, url: &str, name: String) -> ItemResult {
        let start = Instant::now();
        let total = self.total;
        self.progress.on_item_start(index, total, url);

        let dest = self.config.output_dir.join(&name);
        let outcome = match parse_http_url(url) {
            Ok(_) => self.fetch_one(index, url, &dest).await,
            Err(_) => Err(ItemError::InvalidUrl {
                index,
                url: url.to_string(),
            }),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok((bytes, method)) => {
                info!("✓ [{index}/{total}] {url} → {name} ({bytes} bytes)");
                self.progress.on_item_complete(index, total, &name, bytes);
                ItemResult {
                    index,
                    label: url.to_string(),
                    url: url.to_string(),
                    path: Some(dest),
                    bytes,
                    duration_ms,
                    method: Some(method),
                    error: None,
                }
            }
            Err(e) => {
                warn!("✗ [{index}/{total}] {e}");
                self.progress.on_item_error(index, total, url, &e.to_string());
                ItemResult::failed(index, url, url, e, duration_ms)
            }
        }
    }

    async fn fetch_one(
        &self,
        index: usize,
        url: &str,
        dest: &Path,
    ) -> Result<(u64, FetchMethod), ItemError> {
        let timeout = self.config.download_timeout_secs;
        match self.config.conversion_mode {
            ConversionMode::Download => {
                let (bytes, looks_like_pdf) =
                    download_to(self.client, index, url, dest, timeout).await?;
                if !looks_like_pdf {
                    warn!("Item {index}: '{url}' did not return a PDF; saved as-is");
                }
                Ok((bytes, FetchMethod::Downloaded))
            }
            ConversionMode::Render => self.render(index, url, dest).await,
            ConversionMode::Auto => match probe(self.client, index, url, timeout).await? {
                Probe::Body(fetched) if fetched.is_pdf() => {
                    let bytes = write_atomic(index, dest, &fetched.body).await?;
                    Ok((bytes, FetchMethod::Downloaded))
                }
                Probe::Body(_) => self.render(index, url, dest).await,
                // The server answered; a browser may still get a page out of it.
                Probe::Status(status) if self.renderer.is_some() => {
                    debug!("GET {url} returned HTTP {status}; rendering instead");
                    self.render(index, url, dest).await
                }
                Probe::Status(status) => Err(ItemError::DownloadFailed {
                    index,
                    url: url.to_string(),
                    detail: format!("HTTP {status}"),
                }),
            },
        }
    }

    async fn render(
        &self,
        index: usize,
        url: &str,
        dest: &Path,
    ) -> Result<(u64, FetchMethod), ItemError> {
        let Some(ref renderer) = self.renderer else {
            return Err(ItemError::RenderFailed {
                index,
                url: url.to_string(),
                detail: "no headless browser available".into(),
            });
        };

        renderer.render(url, dest).await.map_err(|f| match f {
            RenderFailure::Failed(detail) => ItemError::RenderFailed {
                index,
                url: url.to_string(),
                detail,
            },
            RenderFailure::TimedOut(secs) => ItemError::Timeout {
                index,
                url: url.to_string(),
                secs,
            },
        })?;

        let bytes = tokio::fs::metadata(dest)
            .await
            .map(|m| m.len())
            .map_err(|e| ItemError::WriteFailed {
                index,
                path: dest.display().to_string(),
                detail: e.to_string(),
            })?;
        Ok((bytes, FetchMethod::Rendered))
    }
}
