//! HTTP client for the LifeScore API, used by the `lifescore` CLI.
//!
//! `wait_for_analysis` polls the report detail route on a fixed interval
//! until an analysis is attached.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::ReportWithAnalysis;
use crate::reports::DocumentKind;

pub mod render;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected the request ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Report {0} not found")]
    NotFound(Uuid),

    #[error("Analysis for report {report_id} not ready after {attempts} attempts")]
    TimedOut { report_id: Uuid, attempts: u32 },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until the analysis appears. At least one request is
    /// always made, so `Some(0)` behaves like `Some(1)`.
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub report_id: Uuid,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Uploads a document. The MIME type is detected from content, then from the extension.
    pub async fn upload(&self, path: &Path) -> Result<UploadReceipt, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = DocumentKind::sniff(&bytes)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(DocumentKind::from_extension)
            })
            .map(|k| k.mime_type())
            .unwrap_or("application/octet-stream");

        let part = Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/reports/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    pub async fn list_reports(&self) -> Result<Vec<ReportWithAnalysis>, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/reports", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Returns `None` when the server does not know the report.
    pub async fn get_report(&self, id: Uuid) -> Result<Option<ReportWithAnalysis>, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/reports/{id}", self.base_url))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    /// Polls until the report has an analysis or `max_attempts` is exhausted.
    pub async fn wait_for_analysis(
        &self,
        id: Uuid,
        poll: PollConfig,
    ) -> Result<ReportWithAnalysis, ClientError> {
        let mut attempts = 0u32;
        loop {
            let report = self.get_report(id).await?.ok_or(ClientError::NotFound(id))?;
            attempts += 1;
            if !report.is_pending() {
                return Ok(report);
            }
            if poll.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(ClientError::TimedOut {
                    report_id: id,
                    attempts,
                });
            }
            debug!(%id, attempts, "Analysis still in progress");
            tokio::time::sleep(poll.interval).await;
        }
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => ("UNKNOWN".to_string(), text),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}
