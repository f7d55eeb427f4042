use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ledgerlens_ingest::{BackendError, PageScrapeBackend, PdfBackend, TextExtractor};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

/// Write a small text-only PDF, one page per entry in `pages`.
fn write_pdf(path: &Path, pages: &[&[&str]]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for line in *lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// High-fidelity stand-in that always fails the same way.
struct DownService;

#[async_trait]
impl PdfBackend for DownService {
    fn name(&self) -> &str {
        "down-service"
    }
    async fn extract(&self, _path: &Path) -> Result<String, BackendError> {
        Err(BackendError::Http("503 Service Unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_fallback_returns_text_for_well_formed_pdf() {
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("statement.pdf");
    write_pdf(
        &pdf,
        &[
            &["Statement Period: Jan 1 2024 - Jan 31 2024", "Jan 03 GROCERY 5.82"],
            &["Jan 28 WALMART 14.05"],
        ],
    );

    let extractor = TextExtractor::new(Arc::new(DownService), Arc::new(PageScrapeBackend::new()));
    let out = extractor.extract(&pdf).await.unwrap();

    assert!(out.used_fallback);
    assert_eq!(out.backend, "page-scrape");
    assert!(!out.text.trim().is_empty());
    assert!(out.text.contains("Statement Period"), "text was: {:?}", out.text);
    assert!(out.text.contains("WALMART"));
}

#[tokio::test]
async fn test_page_scrape_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("chequing.pdf");
    write_pdf(&pdf, &[&["TRANSACTION DETAIL", "04/22 PAYROLL ACME INC 100.00 153.70"]]);

    let backend = PageScrapeBackend::new();
    let a = backend.extract(&pdf).await.unwrap();
    let b = backend.extract(&pdf).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_both_backends_fail_on_non_pdf() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("not-a.pdf");
    std::fs::write(&bogus, b"plain text pretending to be a pdf").unwrap();

    let extractor = TextExtractor::new(Arc::new(DownService), Arc::new(PageScrapeBackend::new()));
    let err = extractor.extract(&bogus).await.unwrap_err();

    assert!(matches!(err.primary, BackendError::Http(_)));
    assert!(matches!(err.fallback, BackendError::Malformed(_)));
    assert!(err.to_string().contains("not-a.pdf"));
}
