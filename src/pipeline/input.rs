//! Input resolution: load the trigger payload or report list from disk and
//! validate URLs before anything touches the network.
//!
//! A malformed file is fatal and surfaces before the first request, so a run
//! never leaves a half-populated output directory behind because of a typo
//! in its input.

use crate::error::FetchError;
use crate::payload::{ReportRecord, TriggerPayload};
use std::path::Path;
use tracing::debug;
use url::Url;

/// Parse `input` as an absolute http(s) URL.
pub fn parse_http_url(input: &str) -> Result<Url, FetchError> {
    let url = Url::parse(input.trim()).map_err(|e| FetchError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        other => Err(FetchError::InvalidUrl {
            url: input.to_string(),
            reason: format!("unsupported scheme '{other}' or missing host"),
        }),
    }
}

/// Load a trigger payload (bare or dispatch-event envelope) from a file.
pub async fn load_payload(path: &Path) -> Result<TriggerPayload, FetchError> {
    let text = read_input(path).await?;
    let payload = TriggerPayload::from_json_str(&text).map_err(|e| match e {
        FetchError::InvalidPayload(detail) => FetchError::InvalidInputFile {
            path: path.to_path_buf(),
            detail,
        },
        other => other,
    })?;
    debug!(
        "Loaded payload from {}: {} links",
        path.display(),
        payload.links.len()
    );
    Ok(payload)
}

/// Load the batch downloader's report list.
///
/// The whole file must parse as a JSON array of `{title, pdfUrl}` records;
/// any deviation aborts before a single download starts.
pub async fn load_reports(path: &Path) -> Result<Vec<ReportRecord>, FetchError> {
    let text = read_input(path).await?;
    parse_reports(&text).map_err(|detail| FetchError::InvalidInputFile {
        path: path.to_path_buf(),
        detail,
    })
}

/// Parse a report list from a JSON string.
pub fn parse_reports(json: &str) -> Result<Vec<ReportRecord>, String> {
    serde_json::from_str(json).map_err(|e| e.to_string())
}

async fn read_input(path: &Path) -> Result<String, FetchError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(FetchError::InvalidInputFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}
