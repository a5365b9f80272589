//! Webhook reporter: summarise the output directory and POST it back.
//!
//! The summary reflects what is on disk at POST time, not what the job
//! believes it produced. A PDF that some earlier step left behind is counted;
//! one that failed to land is not.

use crate::config::JobConfig;
use crate::error::FetchError;
use crate::payload::{TriggerPayload, WebhookDetail, WebhookMetadata, WebhookPayload};
use crate::pipeline::input::parse_http_url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one webhook POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReport {
    pub url: String,
    pub status: u16,
    /// Whether the receiver answered with a 2xx status.
    pub delivered: bool,
    pub successful_pdfs: usize,
}

/// Names of the `.pdf` entries directly inside `dir`, sorted.
///
/// The extension check ignores case. A missing directory yields an empty
/// list.
pub async fn list_pdfs(dir: &Path) -> Result<Vec<String>, FetchError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(FetchError::DirectoryFailed {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FetchError::DirectoryFailed {
            path: dir.to_path_buf(),
            source: e,
        })?
    {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if is_pdf && !is_dir {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Assemble the summary body from a file listing.
pub fn build_payload(
    run_id: Option<&str>,
    timestamp: Value,
    processed_urls: u64,
    files: Vec<String>,
) -> WebhookPayload {
    WebhookPayload {
        metadata: WebhookMetadata {
            run_id: run_id.map(str::to_string),
            timestamp,
            processed_urls,
            successful_pdfs: files.len(),
        },
        details: files
            .into_iter()
            .map(|filename| WebhookDetail { filename })
            .collect(),
    }
}

/// POST `body` to `url` once.
///
/// A non-2xx answer is logged and reported with `delivered = false`; only a
/// request that never gets an answer is an error.
pub async fn post(
    client: &reqwest::Client,
    url: &str,
    body: &WebhookPayload,
    timeout_secs: Option<u64>,
) -> Result<WebhookReport, FetchError> {
    let target = parse_http_url(url)?;

    let mut request = client.post(target).json(body);
    if let Some(secs) = timeout_secs {
        request = request.timeout(Duration::from_secs(secs));
    }

    let response = request.send().await.map_err(|e| FetchError::WebhookFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    let delivered = status.is_success();
    if delivered {
        info!(
            "Webhook delivered ({}): {} PDFs reported",
            status, body.metadata.successful_pdfs
        );
    } else {
        warn!("Webhook receiver at {} answered {}", url, status);
    }

    Ok(WebhookReport {
        url: url.to_string(),
        status: status.as_u16(),
        delivered,
        successful_pdfs: body.metadata.successful_pdfs,
    })
}

/// List `dir`, build the summary for `trigger` and POST it to the trigger's
/// webhook.
pub async fn report(
    client: &reqwest::Client,
    dir: &Path,
    trigger: &TriggerPayload,
    config: &JobConfig,
) -> Result<WebhookReport, FetchError> {
    let files = list_pdfs(dir).await?;
    let body = build_payload(
        config.run_id.as_deref(),
        trigger.timestamp.clone(),
        trigger.declared_count(),
        files,
    );
    post(client, &trigger.n8n_webhook, &body, config.webhook_timeout_secs).await
}
