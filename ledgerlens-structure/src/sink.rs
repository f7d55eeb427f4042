//! Persistence collaborators for validated records.
//!
//! A sink only ever receives a record that already passed validation.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! failed write never leaves a truncated artifact behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ledgerlens_core::StructuredRecord;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("failed to persist record to {}: {source}", .path.display())]
pub struct PersistenceFailure {
    pub path: PathBuf,
    pub source: io::Error,
}

impl PersistenceFailure {
    fn at(path: &Path) -> impl FnOnce(io::Error) -> PersistenceFailure + '_ {
        move |source| PersistenceFailure {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub trait RecordSink: Send + Sync {
    /// Persist `record` extracted from `source`; returns the primary artifact path.
    fn persist(&self, source: &Path, record: &StructuredRecord) -> Result<PathBuf, PersistenceFailure>;
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Write the record as pretty JSON.
pub fn write_json(path: &Path, record: &StructuredRecord) -> Result<(), PersistenceFailure> {
    let json = record.to_json_pretty().map_err(|e| PersistenceFailure {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;
    write_atomic(path, json.as_bytes()).map_err(PersistenceFailure::at(path))?;
    info!(path = %path.display(), "wrote structured record");
    Ok(())
}

/// Write the transaction list as CSV, one row per transaction in order.
pub fn write_transactions_csv(path: &Path, record: &StructuredRecord) -> Result<(), PersistenceFailure> {
    let bytes = transactions_csv(record).map_err(PersistenceFailure::at(path))?;
    write_atomic(path, &bytes).map_err(PersistenceFailure::at(path))?;
    info!(path = %path.display(), rows = record.transaction_count(), "wrote transactions csv");
    Ok(())
}

fn transactions_csv(record: &StructuredRecord) -> io::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    match record {
        StructuredRecord::CreditCard(s) => {
            wtr.write_record(["date", "description", "amount"])?;
            for t in &s.transactions {
                wtr.write_record([t.date.to_string(), t.description.clone(), t.amount.to_string()])?;
            }
        }
        StructuredRecord::Chequing(s) => {
            wtr.write_record(["date", "description", "type", "amount", "running_balance"])?;
            for t in &s.transactions {
                wtr.write_record([
                    t.date.to_string(),
                    t.description.clone(),
                    t.kind.as_str().to_string(),
                    t.amount.to_string(),
                    t.running_balance.to_string(),
                ])?;
            }
        }
    }
    wtr.into_inner().map_err(|e| io::Error::other(e.to_string()))
}

/// Writes every record to one caller-specified path (single-document runs).
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    csv_path: Option<PathBuf>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            csv_path: None,
        }
    }

    pub fn with_transactions_csv(mut self, csv_path: impl Into<PathBuf>) -> Self {
        self.csv_path = Some(csv_path.into());
        self
    }
}

impl RecordSink for JsonFileSink {
    fn persist(&self, _source: &Path, record: &StructuredRecord) -> Result<PathBuf, PersistenceFailure> {
        write_json(&self.path, record)?;
        if let Some(csv_path) = &self.csv_path {
            write_transactions_csv(csv_path, record)?;
        }
        Ok(self.path.clone())
    }
}

/// Writes `<dir>/<pdf stem>.json` (and optionally `<stem>.transactions.csv`).
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
    csv: bool,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            csv: false,
        }
    }

    pub fn with_transactions_csv(mut self, enabled: bool) -> Self {
        self.csv = enabled;
        self
    }

    pub fn json_path_for(&self, source: &Path) -> PathBuf {
        self.dir.join(format!("{}.json", stem(source)))
    }

    pub fn csv_path_for(&self, source: &Path) -> PathBuf {
        self.dir.join(format!("{}.transactions.csv", stem(source)))
    }
}

fn stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "statement".to_string())
}

impl RecordSink for JsonDirSink {
    fn persist(&self, source: &Path, record: &StructuredRecord) -> Result<PathBuf, PersistenceFailure> {
        let json_path = self.json_path_for(source);
        write_json(&json_path, record)?;
        if self.csv {
            write_transactions_csv(&self.csv_path_for(source), record)?;
        }
        Ok(json_path)
    }
}
