//! Basic backend: linear page-by-page text scrape with lopdf.
//!
//! Deterministic and fully local. Layout is not reconstructed; each page's
//! text runs are emitted in content-stream order and pages are joined with
//! a form feed (`\x0C`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lopdf::Document;
use tracing::{debug, warn};

use crate::backend::{BackendError, PdfBackend};

pub const PAGE_SEPARATOR: &str = "\x0C";

#[derive(Debug, Clone, Default)]
pub struct PageScrapeBackend;

impl PageScrapeBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfBackend for PageScrapeBackend {
    fn name(&self) -> &str {
        "page-scrape"
    }

    async fn extract(&self, path: &Path) -> Result<String, BackendError> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || scrape_pages(&path))
            .await
            .map_err(|e| BackendError::Io(format!("page scrape task failed: {e}")))?
    }
}

/// Scrape every page in order. Pages whose text cannot be decoded are
/// skipped; a document with no decodable text at all is an error.
pub fn scrape_pages(path: &Path) -> Result<String, BackendError> {
    let document = Document::load(path).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("No such file") {
            BackendError::FileNotFound(path.to_path_buf())
        } else {
            BackendError::Malformed(msg)
        }
    })?;

    let pages = document.get_pages();
    let mut out = Vec::with_capacity(pages.len());

    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => out.push(text.trim_end().to_string()),
            Err(e) => {
                warn!(page = *page_number, error = %e, "skipping page with undecodable text");
                out.push(String::new());
            }
        }
    }

    let text = out.join(PAGE_SEPARATOR);
    if text.trim().is_empty() {
        return Err(BackendError::EmptyText);
    }

    debug!(pages = pages.len(), chars = text.len(), "page scrape complete");
    Ok(text)
}
