//! Plain HTTP downloads.
//!
//! Bodies are buffered in memory and written through a `.part` file that is
//! renamed into place, so a failed item never leaves a truncated PDF in the
//! output directory for the webhook listing to count.

use crate::config::JobConfig;
use crate::error::{FetchError, ItemError};
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Response body plus the bits needed to decide what to do with it.
pub struct Fetched {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Fetched {
    /// Whether the server sent a PDF, judged by header or magic bytes.
    pub fn is_pdf(&self) -> bool {
        is_pdf(self.content_type.as_deref(), &self.body)
    }
}

/// Returns true if a content-type or the leading bytes indicate a PDF.
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains("application/pdf") || head.starts_with(b"%PDF-")
}

/// Build the shared HTTP client for a run.
///
/// Timeouts are applied per request (see [`get`]) rather than on the client,
/// so the same client serves the untimed webhook POST as well.
pub fn build_client(config: &JobConfig) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| FetchError::HttpClient(e.to_string()))
}

/// What came back from a GET that reached the server.
pub enum Probe {
    /// 2xx with the buffered body.
    Body(Fetched),
    /// The server answered with a non-success status.
    Status(reqwest::StatusCode),
}

/// GET `url` and buffer the body. Non-2xx statuses are failures.
pub async fn get(
    client: &reqwest::Client,
    index: usize,
    url: &str,
    timeout_secs: Option<u64>,
) -> Result<Fetched, ItemError> {
    match probe(client, index, url, timeout_secs).await? {
        Probe::Body(fetched) => Ok(fetched),
        Probe::Status(status) => Err(ItemError::DownloadFailed {
            index,
            url: url.to_string(),
            detail: format!("HTTP {status}"),
        }),
    }
}

/// GET `url`, keeping a non-2xx answer apart from transport failures.
///
/// Connection, DNS and timeout errors are `Err`; only a server that actually
/// answered yields `Ok`.
pub async fn probe(
    client: &reqwest::Client,
    index: usize,
    url: &str,
    timeout_secs: Option<u64>,
) -> Result<Probe, ItemError> {
    let mut request = client.get(url);
    if let Some(secs) = timeout_secs {
        request = request.timeout(Duration::from_secs(secs));
    }

    let map_err = |e: reqwest::Error| match timeout_secs {
        Some(secs) if e.is_timeout() => ItemError::Timeout {
            index,
            url: url.to_string(),
            secs,
        },
        _ => ItemError::DownloadFailed {
            index,
            url: url.to_string(),
            detail: e.to_string(),
        },
    };

    let response = request.send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Ok(Probe::Status(response.status()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.bytes().await.map_err(map_err)?.to_vec();
    debug!("GET {url}: {} bytes ({:?})", body.len(), content_type);

    Ok(Probe::Body(Fetched { content_type, body }))
}

/// Write `bytes` to `dest` via a sibling `.part` file and a rename.
pub async fn write_atomic(index: usize, dest: &Path, bytes: &[u8]) -> Result<u64, ItemError> {
    let write_err = |e: std::io::Error| ItemError::WriteFailed {
        index,
        path: dest.display().to_string(),
        detail: e.to_string(),
    };

    let tmp_path = dest.with_extension("pdf.part");
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    tokio::fs::rename(&tmp_path, dest).await.map_err(write_err)?;

    Ok(bytes.len() as u64)
}

/// Fetch `url` straight to `dest`.
pub async fn download_to(
    client: &reqwest::Client,
    index: usize,
    url: &str,
    dest: &Path,
    timeout_secs: Option<u64>,
) -> Result<(u64, bool), ItemError> {
    let fetched = get(client, index, url, timeout_secs).await?;
    let looks_like_pdf = fetched.is_pdf();
    let written = write_atomic(index, dest, &fetched.body).await?;
    Ok((written, looks_like_pdf))
}
