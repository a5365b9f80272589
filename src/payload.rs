//! Wire types: the inbound trigger payload, the report list, and the
//! outbound webhook body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// Event data that starts the fetch job.
///
/// `timestamp` is opaque and echoed back verbatim; `count` is whatever the
/// caller claims and is never checked against `links.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub links: Vec<String>,
    pub n8n_webhook: String,
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub count: Option<u64>,
}

impl TriggerPayload {
    /// Parse a payload, unwrapping a repository-dispatch `client_payload`
    /// envelope when present.
    pub fn from_json_str(json: &str) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| FetchError::InvalidPayload(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Same as [`TriggerPayload::from_json_str`] for an already-parsed value.
    pub fn from_value(mut value: Value) -> Result<Self, FetchError> {
        if let Some(inner) = value.get_mut("client_payload") {
            value = inner.take();
        }
        serde_json::from_value(value).map_err(|e| FetchError::InvalidPayload(e.to_string()))
    }

    /// The count reported as `processed_urls`: the declared one, else the
    /// number of links actually supplied.
    pub fn declared_count(&self) -> u64 {
        self.count.unwrap_or(self.links.len() as u64)
    }
}

/// One entry of the batch downloader's input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub title: String,
    #[serde(rename = "pdfUrl")]
    pub pdf_url: String,
}

/// Summary POSTed to the caller's webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub metadata: WebhookMetadata,
    pub details: Vec<WebhookDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookMetadata {
    pub run_id: Option<String>,
    pub timestamp: Value,
    pub processed_urls: u64,
    pub successful_pdfs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookDetail {
    pub filename: String,
}
