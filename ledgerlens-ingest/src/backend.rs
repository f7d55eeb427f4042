//! PDF backend capability.
//!
//! A backend turns a PDF on disk into plain text. The extractor depends on
//! nothing else about it: no backend-specific configuration leaks past
//! this trait.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Why a single backend could not produce text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("PDF file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unable to read PDF: {0}")]
    Io(String),

    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("parse job failed: {0}")]
    Job(String),

    #[error("malformed PDF: {0}")]
    Malformed(String),

    #[error("backend returned no text")]
    EmptyText,

    #[error("backend not configured")]
    Unavailable,
}

/// Backend trait for PDF text extraction
#[async_trait]
pub trait PdfBackend: Send + Sync {
    /// Backend identifier for logging
    fn name(&self) -> &str;

    /// Extract the full plain text of the PDF at `path`.
    async fn extract(&self, path: &Path) -> Result<String, BackendError>;
}
