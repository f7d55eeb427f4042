//! Text extraction with a single-hop fallback.
//!
//! The high-fidelity backend is tried first; any failure is logged and the
//! basic backend is tried. Only one backend's text is ever used. If both
//! fail the caller gets both causes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{BackendError, PdfBackend};

/// Both backends failed for `path`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("text extraction failed for {}: primary: {primary}; fallback: {fallback}", .path.display())]
pub struct ExtractionFailure {
    pub path: PathBuf,
    pub primary: BackendError,
    pub fallback: BackendError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Deadline for the high-fidelity backend (network round trip)
    pub primary_timeout: Duration,
    pub fallback_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            primary_timeout: Duration::from_secs(120),
            fallback_timeout: Duration::from_secs(60),
        }
    }
}

/// Text pulled from one PDF, tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub backend: String,
    pub used_fallback: bool,
}

pub struct TextExtractor {
    primary: Option<Arc<dyn PdfBackend>>,
    fallback: Arc<dyn PdfBackend>,
    config: ExtractorConfig,
}

impl TextExtractor {
    pub fn new(primary: Arc<dyn PdfBackend>, fallback: Arc<dyn PdfBackend>) -> Self {
        Self {
            primary: Some(primary),
            fallback,
            config: ExtractorConfig::default(),
        }
    }

    /// Extractor with no high-fidelity backend configured.
    pub fn fallback_only(fallback: Arc<dyn PdfBackend>) -> Self {
        Self {
            primary: None,
            fallback,
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Extract non-empty plain text from the PDF at `path`.
    pub async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractionFailure> {
        if !path.is_file() {
            let missing = BackendError::FileNotFound(path.to_path_buf());
            return Err(ExtractionFailure {
                path: path.to_path_buf(),
                primary: missing.clone(),
                fallback: missing,
            });
        }

        let primary_err = match &self.primary {
            Some(primary) => match attempt(primary.as_ref(), path, self.config.primary_timeout).await {
                Ok(text) => {
                    info!(backend = primary.name(), chars = text.len(), "extracted text");
                    return Ok(ExtractedText {
                        text,
                        backend: primary.name().to_string(),
                        used_fallback: false,
                    });
                }
                Err(e) => {
                    warn!(backend = primary.name(), error = %e, "primary extraction failed, falling back");
                    e
                }
            },
            None => BackendError::Unavailable,
        };

        match attempt(self.fallback.as_ref(), path, self.config.fallback_timeout).await {
            Ok(text) => {
                info!(backend = self.fallback.name(), chars = text.len(), "extracted text via fallback");
                Ok(ExtractedText {
                    text,
                    backend: self.fallback.name().to_string(),
                    used_fallback: true,
                })
            }
            Err(fallback_err) => {
                warn!(backend = self.fallback.name(), error = %fallback_err, "fallback extraction failed");
                Err(ExtractionFailure {
                    path: path.to_path_buf(),
                    primary: primary_err,
                    fallback: fallback_err,
                })
            }
        }
    }
}

async fn attempt(backend: &dyn PdfBackend, path: &Path, limit: Duration) -> Result<String, BackendError> {
    match tokio::time::timeout(limit, backend.extract(path)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
        Ok(Ok(_)) => Err(BackendError::EmptyText),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(BackendError::Timeout(limit)),
    }
}
