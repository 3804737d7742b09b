//! Durable audit sinks
//!
//! One record per line, JSON-encoded, flushed on every write. Reload with
//! [`load_jsonl`] and verify the chain before trusting it.

use crate::log::{verify_chain, AuditError};
use crate::record::AuditRecord;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Destination for audit records
pub trait AuditSink: Send + Sync {
    /// Persist one record; must be durable before returning
    ///
    /// # Errors
    /// Returns an IO error if the record could not be persisted
    fn write(&self, record: &AuditRecord) -> Result<(), std::io::Error>;
}

/// Append-only JSONL file sink
pub struct JsonlSink {
    file: Mutex<File>,
}

impl JsonlSink {
    /// Open (or create) a JSONL audit file for appending
    ///
    /// # Errors
    /// Returns an IO error if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for JsonlSink {
    fn write(&self, record: &AuditRecord) -> Result<(), std::io::Error> {
        let line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        let mut guard = self.file.lock();
        writeln!(guard, "{line}")?;
        guard.flush()
    }
}

/// Load a JSONL audit file and verify its chain
///
/// # Errors
/// Returns [`AuditError::Sink`] on read failure,
/// [`AuditError::Serialization`] on a malformed line, and
/// [`AuditError::IntegrityViolation`] if the reloaded chain does not verify
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>, AuditError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    verify_chain(&records)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::AuditLog;
    use crate::record::PipelineStage;
    use std::sync::Arc;

    fn record(stage: PipelineStage) -> AuditRecord {
        AuditRecord::new(
            "INS_L1_P2_03".parse().unwrap(),
            "gender-swap-client".parse().unwrap(),
            1,
            stage,
            serde_json::json!({"note": "test"}),
        )
    }

    #[test]
    fn sink_round_trip_preserves_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let log = AuditLog::with_sink(Arc::new(JsonlSink::open(&path).unwrap()));
        log.append(record(PipelineStage::SpecDerived)).unwrap();
        log.append(record(PipelineStage::Generated)).unwrap();
        log.append(record(PipelineStage::Delivered)).unwrap();

        let reloaded = load_jsonl(&path).unwrap();
        assert_eq!(reloaded, log.records());
    }

    #[test]
    fn load_rejects_tampered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let log = AuditLog::with_sink(Arc::new(JsonlSink::open(&path).unwrap()));
        log.append(record(PipelineStage::SpecDerived)).unwrap();
        log.append(record(PipelineStage::Generated)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let forged = contents.replace("\"attempt\":1", "\"attempt\":2");
        std::fs::write(&path, forged).unwrap();

        assert!(matches!(
            load_jsonl(&path),
            Err(AuditError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn load_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        assert!(matches!(load_jsonl(&path), Err(AuditError::Serialization(_))));
    }
}
