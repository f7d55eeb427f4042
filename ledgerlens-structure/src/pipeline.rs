//! Orchestration: load PDF → extract text → select processor → structure
//! and validate → persist.
//!
//! Each stage fails fast with a tagged failure; no later stage runs after an
//! earlier one fails. Nothing is written before a record validates, so a run
//! can be abandoned (its future dropped) at any point without side effects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use ledgerlens_core::{StatementKind, StructuredRecord, UnsupportedKind};
use ledgerlens_ingest::{ExtractionFailure, TextExtractor};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::factory::ProcessorFactory;
use crate::processor::ProcessingFailure;
use crate::sink::{PersistenceFailure, RecordSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Selection,
    Structuring,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineFailure {
    #[error("extraction stage failed: {0}")]
    Extraction(#[from] ExtractionFailure),

    #[error("processor selection failed: {0}")]
    UnsupportedKind(#[from] UnsupportedKind),

    /// Carries the extracted text so a caller can retry structuring
    /// without extracting again.
    #[error("structuring stage failed: {cause}")]
    Structuring {
        raw_text: String,
        #[source]
        cause: ProcessingFailure,
    },
}

impl PipelineFailure {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineFailure::Extraction(_) => Stage::Extraction,
            PipelineFailure::UnsupportedKind(_) => Stage::Selection,
            PipelineFailure::Structuring { .. } => Stage::Structuring,
        }
    }
}

/// What happened to the record after validation.
#[derive(Debug)]
pub enum PersistenceOutcome {
    /// No sink configured
    Skipped,
    Written(PathBuf),
    /// The record is still valid; only the write failed.
    Failed(PersistenceFailure),
}

#[derive(Debug)]
pub struct RunOutput {
    pub source: PathBuf,
    pub raw_text: String,
    /// Backend that produced `raw_text`
    pub backend: String,
    pub used_fallback: bool,
    pub record: StructuredRecord,
    pub persistence: PersistenceOutcome,
}

pub struct Pipeline {
    extractor: TextExtractor,
    factory: ProcessorFactory,
    sink: Option<Arc<dyn RecordSink>>,
}

impl Pipeline {
    pub fn new(extractor: TextExtractor, factory: ProcessorFactory) -> Self {
        Self {
            extractor,
            factory,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run one document through every stage.
    pub async fn run(&self, path: &Path, kind: StatementKind) -> Result<RunOutput, PipelineFailure> {
        info!(path = %path.display(), kind = %kind, "pipeline run started");

        let extracted = self.extractor.extract(path).await?;
        let record = self.structure(&extracted.text, kind).await?;
        let persistence = self.persist(path, &record);

        Ok(RunOutput {
            source: path.to_path_buf(),
            raw_text: extracted.text,
            backend: extracted.backend,
            used_fallback: extracted.used_fallback,
            record,
            persistence,
        })
    }

    /// Select a processor and structure already-extracted text.
    pub async fn structure(&self, raw_text: &str, kind: StatementKind) -> Result<StructuredRecord, PipelineFailure> {
        let processor = self.factory.for_kind(kind)?;
        processor
            .process(raw_text)
            .await
            .map_err(|cause| PipelineFailure::Structuring {
                raw_text: raw_text.to_string(),
                cause,
            })
    }

    /// Hand a validated record to the configured sink, if any.
    pub fn persist(&self, source: &Path, record: &StructuredRecord) -> PersistenceOutcome {
        let Some(sink) = &self.sink else {
            return PersistenceOutcome::Skipped;
        };
        match sink.persist(source, record) {
            Ok(path) => PersistenceOutcome::Written(path),
            Err(e) => {
                warn!(error = %e, "persisting record failed; record is still valid");
                PersistenceOutcome::Failed(e)
            }
        }
    }

    /// Run independent documents concurrently, at most `concurrency` at a
    /// time. Results come back in input order.
    pub async fn run_many(
        &self,
        jobs: &[(PathBuf, StatementKind)],
        concurrency: usize,
    ) -> Vec<Result<RunOutput, PipelineFailure>> {
        let permits = Semaphore::new(concurrency.max(1));
        let runs = jobs.iter().map(|(path, kind)| {
            let permits = &permits;
            async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = permits.acquire().await.ok();
                self.run(path, *kind).await
            }
        });
        join_all(runs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlens_ingest::BackendError;

    #[test]
    fn test_stage_tags() {
        let extraction = PipelineFailure::Extraction(ExtractionFailure {
            path: PathBuf::from("a.pdf"),
            primary: BackendError::EmptyText,
            fallback: BackendError::EmptyText,
        });
        assert_eq!(extraction.stage(), Stage::Extraction);

        let selection = PipelineFailure::from(UnsupportedKind("loan".to_string()));
        assert_eq!(selection.stage(), Stage::Selection);

        let structuring = PipelineFailure::Structuring {
            raw_text: "text".to_string(),
            cause: ProcessingFailure::Unparseable("prose".to_string()),
        };
        assert_eq!(structuring.stage(), Stage::Structuring);
        assert!(structuring.to_string().starts_with("structuring stage failed"));
    }
}
