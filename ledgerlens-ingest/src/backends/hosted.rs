//! High-fidelity backend: a hosted document-parsing service.
//!
//! The service handles multi-column layouts and tables. Protocol:
//!   POST {base}/api/parsing/upload              (multipart "file") -> { id }
//!   GET  {base}/api/parsing/job/{id}            -> { status }
//!   GET  {base}/api/parsing/job/{id}/result/text -> { text }
//!
//! Polling continues until the job settles; the overall deadline belongs to
//! the caller (see [`crate::TextExtractor`]), which drops this future on
//! expiry and so cancels the in-flight request.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::backend::{BackendError, PdfBackend};

#[derive(Debug, Clone)]
pub struct HostedParseConfig {
    pub base_url: String,
    /// Already-resolved API key; `None` means the service cannot be used.
    pub api_key: Option<String>,
    pub poll_interval: Duration,
}

impl Default for HostedParseConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloud.llamaindex.ai".to_string(),
            api_key: None,
            poll_interval: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostedParseBackend {
    client: reqwest::Client,
    config: HostedParseConfig,
}

#[derive(Deserialize)]
struct UploadResp {
    id: String,
}

#[derive(Deserialize)]
struct JobResp {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct TextResp {
    text: String,
}

impl HostedParseBackend {
    /// `client` should be shared across runs; reqwest clients pool connections.
    pub fn new(client: reqwest::Client, config: HostedParseConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn upload(&self, key: &str, path: &Path) -> Result<String, BackendError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::FileNotFound(path.to_path_buf())
            } else {
                BackendError::Io(e.to_string())
            }
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "statement.pdf".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| BackendError::Http(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url("/api/parsing/upload"))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Http(format!("upload: {e}")))?;

        let out: UploadResp = json_or_error(resp, "upload").await?;
        Ok(out.id)
    }

    async fn wait_for_job(&self, key: &str, id: &str) -> Result<(), BackendError> {
        loop {
            let resp = self
                .client
                .get(self.url(&format!("/api/parsing/job/{id}")))
                .bearer_auth(key)
                .send()
                .await
                .map_err(|e| BackendError::Http(format!("job status: {e}")))?;

            let job: JobResp = json_or_error(resp, "job status").await?;
            match job.status.as_str() {
                "SUCCESS" => return Ok(()),
                "ERROR" | "CANCELED" | "CANCELLED" => {
                    return Err(BackendError::Job(
                        job.error_message.unwrap_or_else(|| job.status.to_lowercase()),
                    ));
                }
                other => {
                    debug!(job = id, status = other, "parse job pending");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn fetch_text(&self, key: &str, id: &str) -> Result<String, BackendError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/parsing/job/{id}/result/text")))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| BackendError::Http(format!("result: {e}")))?;

        let out: TextResp = json_or_error(resp, "result").await?;
        Ok(out.text)
    }
}

async fn json_or_error<T: for<'de> Deserialize<'de>>(resp: Response, step: &str) -> Result<T, BackendError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let txt = resp.text().await.unwrap_or_default();
        return Err(BackendError::Auth(format!("{step}: {status} {txt}")));
    }
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(BackendError::Http(format!("{step}: {status} {txt}")));
    }
    resp.json::<T>()
        .await
        .map_err(|e| BackendError::Http(format!("{step}: parse response: {e}")))
}

#[async_trait]
impl PdfBackend for HostedParseBackend {
    fn name(&self) -> &str {
        "hosted-parse"
    }

    async fn extract(&self, path: &Path) -> Result<String, BackendError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BackendError::MissingCredentials("hosted parse API key".to_string()))?;

        let id = self.upload(key, path).await?;
        debug!(job = %id, "parse job submitted");
        self.wait_for_job(key, &id).await?;
        let text = self.fetch_text(key, &id).await?;
        if text.trim().is_empty() {
            return Err(BackendError::EmptyText);
        }
        Ok(text)
    }
}
