//! ledgerlens-ingest: PDF text extraction through pluggable backends with a
//! high-fidelity primary and a basic page-scrape fallback.

pub mod backend;
pub mod backends;
pub mod extractor;

pub use backend::{BackendError, PdfBackend};
pub use backends::{HostedParseBackend, HostedParseConfig, PageScrapeBackend};
pub use extractor::{ExtractedText, ExtractionFailure, ExtractorConfig, TextExtractor};
