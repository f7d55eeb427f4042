//! Statement processors: raw text in, validated record out.
//!
//! The variants form a closed set. They share one structuring routine and
//! differ only in the schema they consult, so adding a kind means adding a
//! variant here, a schema entry in `ledgerlens-core` and a factory arm.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ledgerlens_core::{validate, SchemaViolation, StatementKind, StructuredRecord};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::instruction::build_instruction;
use crate::model::{LanguageModel, ModelError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingFailure {
    #[error("language model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("model response is not a JSON object: {0}")]
    Unparseable(String),

    #[error("model response violates schema: {0}")]
    Schema(#[from] SchemaViolation),
}

impl ProcessingFailure {
    /// Field named by a schema violation, if that is what failed.
    pub fn field(&self) -> Option<&str> {
        match self {
            ProcessingFailure::Schema(v) => Some(&v.field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Deadline for the model round trip
    pub timeout: Duration,
    pub max_input_chars: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_input_chars: 100_000,
        }
    }
}

/// Shared single-attempt structuring routine.
#[derive(Clone)]
struct Structurer {
    model: Arc<dyn LanguageModel>,
    config: ProcessorConfig,
}

impl Structurer {
    async fn run(&self, kind: StatementKind, raw_text: &str) -> Result<StructuredRecord, ProcessingFailure> {
        let instruction = build_instruction(kind, raw_text, self.config.max_input_chars);
        let started = Instant::now();

        let response = match tokio::time::timeout(self.config.timeout, self.model.complete(&instruction)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => return Err(ModelError::EmptyResponse.into()),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ModelError::Timeout(self.config.timeout).into()),
        };
        debug!(
            model = self.model.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = response.len(),
            "model responded"
        );

        let candidate = parse_json_object(&response).map_err(ProcessingFailure::Unparseable)?;
        let record = validate(kind, &candidate).map_err(|v| {
            warn!(kind = %kind, field = %v.field, violation = %v.violation, "model output rejected");
            ProcessingFailure::Schema(v)
        })?;

        info!(kind = %kind, transactions = record.transaction_count(), "statement structured");
        Ok(record)
    }
}

/// Pull the JSON object out of a model reply, tolerating Markdown fences
/// and stray prose around it.
pub fn parse_json_object(response: &str) -> Result<Value, String> {
    let trimmed = response.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    let (start, end) = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return Err(format!("no JSON object in response: {}", preview(unfenced))),
    };
    serde_json::from_str::<Value>(&unfenced[start..=end])
        .map_err(|e| format!("{e} in response: {}", preview(unfenced)))
}

fn preview(s: &str) -> String {
    let cut = crate::instruction::truncate_chars(s, 120);
    if cut.len() < s.len() {
        format!("{cut}…")
    } else {
        cut.to_string()
    }
}

#[derive(Clone)]
pub struct CreditCardProcessor {
    inner: Structurer,
}

impl CreditCardProcessor {
    pub const KIND: StatementKind = StatementKind::CreditCard;

    pub fn new(model: Arc<dyn LanguageModel>, config: ProcessorConfig) -> Self {
        Self {
            inner: Structurer { model, config },
        }
    }

    pub async fn process(&self, raw_text: &str) -> Result<StructuredRecord, ProcessingFailure> {
        self.inner.run(Self::KIND, raw_text).await
    }
}

#[derive(Clone)]
pub struct ChequingProcessor {
    inner: Structurer,
}

impl ChequingProcessor {
    pub const KIND: StatementKind = StatementKind::Chequing;

    pub fn new(model: Arc<dyn LanguageModel>, config: ProcessorConfig) -> Self {
        Self {
            inner: Structurer { model, config },
        }
    }

    pub async fn process(&self, raw_text: &str) -> Result<StructuredRecord, ProcessingFailure> {
        self.inner.run(Self::KIND, raw_text).await
    }
}

/// One processor per statement kind.
#[derive(Clone)]
pub enum StatementProcessor {
    CreditCard(CreditCardProcessor),
    Chequing(ChequingProcessor),
}

impl StatementProcessor {
    pub fn kind(&self) -> StatementKind {
        match self {
            StatementProcessor::CreditCard(_) => CreditCardProcessor::KIND,
            StatementProcessor::Chequing(_) => ChequingProcessor::KIND,
        }
    }

    /// Structure `raw_text` in a single model attempt.
    pub async fn process(&self, raw_text: &str) -> Result<StructuredRecord, ProcessingFailure> {
        match self {
            StatementProcessor::CreditCard(p) => p.process(raw_text).await,
            StatementProcessor::Chequing(p) => p.process(raw_text).await,
        }
    }
}
