use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use ledgerlens_core::{StatementKind, StructuredRecord};
use ledgerlens_ingest::{BackendError, PdfBackend, TextExtractor};
use ledgerlens_structure::{
    Instruction, JsonDirSink, JsonFileSink, LanguageModel, ModelError, PersistenceOutcome, Pipeline,
    PipelineFailure, ProcessingFailure, ProcessorConfig, ProcessorFactory, Stage,
};
use tempfile::TempDir;

const CARD_TEXT: &str = "\
ACME BANK VISA PLATINUM
ADA K LOVELACE                         Account: XXXX XXXX XXXX 4821
Credit Limit: $5,000.00
Statement Period: Jan 1 2024 – Jan 31 2024
Trans Date     Description                                   Amount
Jan 03         H-E-B #455SAN MARCOSTX                         $5.82
Jan 12         PAYMENT - THANK YOU                        - $250.00
Jan 28         WALMART.COMWALMART.COMAR                      $14.05
";

const CARD_REPLY: &str = r#"{
  "customer_first_name": "Ada",
  "customer_middle_name": "K",
  "customer_last_name": "Lovelace",
  "account_number": "XXXX XXXX XXXX 4821",
  "card_type": "Visa Platinum",
  "credit_limit": "5000.00",
  "statement_period": { "start": "Jan 1 2024", "end": "Jan 31 2024" },
  "transactions": [
    { "date": "2024-01-03", "description": "H-E-B #455SAN MARCOSTX", "amount": "5.82" },
    { "date": "2024-01-12", "description": "PAYMENT - THANK YOU", "amount": "-250.00" },
    { "date": "2024-01-28", "description": "WALMART.COMWALMART.COMAR", "amount": "14.05" }
  ]
}"#;

const CHEQUING_TEXT_NO_OPENING: &str = "\
CHASE TOTAL CHECKING                       Account Number: 000000123456
April 1, 2026 through April 30, 2026
Ending Balance                                   $153.70
TRANSACTION DETAIL
       DATE        DESCRIPTION                                     AMOUNT     BALANCE
       04/22       Discover     E-Payment 8148   Web ID: 123       -15.00      53.70
       04/23       PAYROLL ACME INC                                100.00     153.70
";

const CHEQUING_REPLY_NO_OPENING: &str = r#"{
  "bank_name": "Chase",
  "account_number": "000000123456",
  "opening_balance": null,
  "closing_balance": "153.70",
  "statement_period": { "start": "2026-04-01", "end": "2026-04-30" },
  "transactions": [
    { "date": "2026-04-22", "description": "Discover E-Payment 8148", "type": "debit", "amount": "-15.00", "running_balance": "53.70" },
    { "date": "2026-04-23", "description": "PAYROLL ACME INC", "type": "credit", "amount": "100.00", "running_balance": "153.70" }
  ]
}"#;

struct TextBackend(&'static str);

#[async_trait]
impl PdfBackend for TextBackend {
    fn name(&self) -> &str {
        "text"
    }
    async fn extract(&self, _path: &Path) -> Result<String, BackendError> {
        Ok(self.0.to_string())
    }
}

struct BrokenBackend;

#[async_trait]
impl PdfBackend for BrokenBackend {
    fn name(&self) -> &str {
        "broken"
    }
    async fn extract(&self, _path: &Path) -> Result<String, BackendError> {
        Err(BackendError::Malformed("unexpected end of file".to_string()))
    }
}

/// Replies from a queue (last reply repeats), counting calls.
struct QueuedModel {
    replies: Vec<&'static str>,
    calls: AtomicUsize,
}

impl QueuedModel {
    fn new(replies: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            replies,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for QueuedModel {
    fn name(&self) -> &str {
        "queued"
    }
    async fn complete(&self, _instruction: &Instruction) -> Result<String, ModelError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.get(n).or(self.replies.last()).copied().unwrap_or_default();
        Ok(reply.to_string())
    }
}

fn pdf_in(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.5 placeholder").unwrap();
    path
}

fn pipeline(primary: Arc<dyn PdfBackend>, fallback: Arc<dyn PdfBackend>, model: Arc<QueuedModel>) -> Pipeline {
    Pipeline::new(
        TextExtractor::new(primary, fallback),
        ProcessorFactory::new(model, ProcessorConfig::default()),
    )
}

#[tokio::test]
async fn test_credit_card_scenario_period_and_three_transactions() {
    let dir = TempDir::new().unwrap();
    let pdf = pdf_in(&dir, "card-jan-2024.pdf");
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let model = QueuedModel::new(vec![CARD_REPLY]);
    let p = pipeline(Arc::new(BrokenBackend), Arc::new(TextBackend(CARD_TEXT)), model.clone())
        .with_sink(Arc::new(JsonDirSink::new(&out_dir)));

    let out = p.run(&pdf, StatementKind::CreditCard).await.unwrap();

    assert!(out.used_fallback);
    assert_eq!(out.raw_text, CARD_TEXT);
    let period = out.record.statement_period();
    assert_eq!(period.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(period.end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    assert_eq!(out.record.transaction_count(), 3);
    assert_eq!(model.calls(), 1);

    // Persisted artifact matches the in-memory record field for field
    let PersistenceOutcome::Written(path) = &out.persistence else {
        panic!("expected a written artifact, got {:?}", out.persistence);
    };
    assert_eq!(path, &out_dir.join("card-jan-2024.json"));
    let back = StructuredRecord::from_json(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(back, out.record);
}

#[tokio::test]
async fn test_chequing_missing_opening_balance_is_rejected() {
    let dir = TempDir::new().unwrap();
    let pdf = pdf_in(&dir, "chequing.pdf");
    let out = dir.path().join("chequing.json");

    let model = QueuedModel::new(vec![CHEQUING_REPLY_NO_OPENING]);
    let p = pipeline(
        Arc::new(TextBackend(CHEQUING_TEXT_NO_OPENING)),
        Arc::new(BrokenBackend),
        model,
    )
    .with_sink(Arc::new(JsonFileSink::new(&out)));

    let err = p.run(&pdf, StatementKind::Chequing).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Structuring);
    let PipelineFailure::Structuring { cause, raw_text } = &err else {
        panic!("expected structuring failure, got {err:?}");
    };
    assert_eq!(cause.field(), Some("opening_balance"));
    assert!(matches!(cause, ProcessingFailure::Schema(_)));
    assert_eq!(raw_text, CHEQUING_TEXT_NO_OPENING);
    // Nothing partial is ever written
    assert!(!out.exists());
}

#[tokio::test]
async fn test_unextractable_input_never_reaches_the_model() {
    let dir = TempDir::new().unwrap();
    let pdf = pdf_in(&dir, "scanned.pdf");

    let model = QueuedModel::new(vec![CARD_REPLY]);
    let p = pipeline(Arc::new(BrokenBackend), Arc::new(BrokenBackend), model.clone());

    let err = p.run(&pdf, StatementKind::CreditCard).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Extraction);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_persistence_failure_keeps_valid_record() {
    let dir = TempDir::new().unwrap();
    let pdf = pdf_in(&dir, "card.pdf");
    let unwritable = dir.path().join("missing-dir").join("card.json");

    let p = pipeline(
        Arc::new(TextBackend(CARD_TEXT)),
        Arc::new(BrokenBackend),
        QueuedModel::new(vec![CARD_REPLY]),
    )
    .with_sink(Arc::new(JsonFileSink::new(&unwritable)));

    let out = p.run(&pdf, StatementKind::CreditCard).await.unwrap();
    assert_eq!(out.record.transaction_count(), 3);
    match &out.persistence {
        PersistenceOutcome::Failed(e) => assert_eq!(e.path, unwritable),
        other => panic!("expected persistence failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_caller_retry_reuses_extracted_text() {
    let dir = TempDir::new().unwrap();
    let pdf = pdf_in(&dir, "card.pdf");

    let model = QueuedModel::new(vec!["Sure! Here is the statement summary.", CARD_REPLY]);
    let p = pipeline(Arc::new(TextBackend(CARD_TEXT)), Arc::new(BrokenBackend), model.clone());

    let err = p.run(&pdf, StatementKind::CreditCard).await.unwrap_err();
    let PipelineFailure::Structuring { raw_text, cause } = err else {
        panic!("expected structuring failure");
    };
    assert!(matches!(cause, ProcessingFailure::Unparseable(_)));

    let record = p.structure(&raw_text, StatementKind::CreditCard).await.unwrap();
    assert_eq!(record.transaction_count(), 3);
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn test_run_many_preserves_input_order() {
    let dir = TempDir::new().unwrap();
    let good = pdf_in(&dir, "good.pdf");
    let missing = dir.path().join("missing.pdf");

    let p = pipeline(
        Arc::new(TextBackend(CARD_TEXT)),
        Arc::new(BrokenBackend),
        QueuedModel::new(vec![CARD_REPLY]),
    );
    let jobs = vec![
        (good.clone(), StatementKind::CreditCard),
        (missing, StatementKind::CreditCard),
        (good, StatementKind::CreditCard),
    ];

    let results = p.run_many(&jobs, 2).await;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert_eq!(results[1].as_ref().unwrap_err().stage(), Stage::Extraction);
    assert!(results[2].is_ok());
}
