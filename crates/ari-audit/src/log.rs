//! Append-only audit log
//!
//! In-memory chained log with an optional durable sink. Append is the only
//! mutation; `verify_integrity` walks the chain and detects any tamper,
//! removal, or reorder.

use crate::record::AuditRecord;
use crate::sink::AuditSink;
use ari_panel::{PanelId, PolicyId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Audit failure
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Chain verification failed
    #[error("audit chain integrity violation at record {index}")]
    IntegrityViolation {
        /// Index of the first bad record
        index: usize,
    },

    /// Durable sink write failed
    #[error("audit sink error: {0}")]
    Sink(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The pipeline's sole history holder
///
/// Thread-safe and append-only. When a sink is attached, every record is
/// written through before append returns, so the durable trail never lags
/// the in-memory one.
#[derive(Default)]
pub struct AuditLog {
    inner: Mutex<Vec<AuditRecord>>,
    sink: Option<Arc<dyn AuditSink>>,
}

impl AuditLog {
    /// Create an in-memory log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that writes through to a durable sink
    #[must_use]
    pub fn with_sink(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            sink: Some(sink),
        }
    }

    /// Append one record, chaining it to the current tail
    ///
    /// # Errors
    /// Returns [`AuditError::Sink`] if the durable write fails; the record
    /// is not appended in that case
    pub fn append(&self, mut record: AuditRecord) -> Result<ulid::Ulid, AuditError> {
        let mut guard = self.inner.lock();
        record.prev_hash = guard.last().map_or([0u8; 32], |r| r.hash);
        record.hash = record.compute_hash();
        if let Some(sink) = &self.sink {
            sink.write(&record)?;
        }
        tracing::debug!(
            panel = %record.panel,
            policy = %record.policy,
            attempt = record.attempt,
            stage = %record.stage,
            "audit append"
        );
        let id = record.id;
        guard.push(record);
        Ok(id)
    }

    /// Snapshot of all records, in append order
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.inner.lock().clone()
    }

    /// Records for one (panel, policy) job, in append order
    #[must_use]
    pub fn records_for(&self, panel: &PanelId, policy: &PolicyId) -> Vec<AuditRecord> {
        self.inner
            .lock()
            .iter()
            .filter(|r| &r.panel == panel && &r.policy == policy)
            .cloned()
            .collect()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Walk the chain and verify every link
    ///
    /// # Errors
    /// Returns [`AuditError::IntegrityViolation`] at the first record whose
    /// chain link or content hash does not verify
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        verify_chain(&self.inner.lock())
    }
}

/// Verify a record sequence as a chain (e.g. records reloaded from a sink)
///
/// # Errors
/// Returns [`AuditError::IntegrityViolation`] at the first bad record
pub fn verify_chain(records: &[AuditRecord]) -> Result<(), AuditError> {
    let mut prev = [0u8; 32];
    for (index, record) in records.iter().enumerate() {
        if record.prev_hash != prev || record.hash != record.compute_hash() {
            return Err(AuditError::IntegrityViolation { index });
        }
        prev = record.hash;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PipelineStage;

    fn record(attempt: u32, stage: PipelineStage) -> AuditRecord {
        AuditRecord::new(
            "INS_L1_P2_03".parse().unwrap(),
            "gender-swap-client".parse().unwrap(),
            attempt,
            stage,
            serde_json::json!({}),
        )
    }

    #[test]
    fn append_chains_records() {
        let log = AuditLog::new();
        log.append(record(1, PipelineStage::SpecDerived)).unwrap();
        log.append(record(1, PipelineStage::Generated)).unwrap();
        log.append(record(1, PipelineStage::Validated)).unwrap();

        let records = log.records();
        assert_eq!(records[0].prev_hash, [0u8; 32]);
        assert_eq!(records[1].prev_hash, records[0].hash);
        assert_eq!(records[2].prev_hash, records[1].hash);
        log.verify_integrity().unwrap();
    }

    #[test]
    fn tampered_record_fails_verification() {
        let log = AuditLog::new();
        log.append(record(1, PipelineStage::SpecDerived)).unwrap();
        log.append(record(1, PipelineStage::Generated)).unwrap();

        let mut records = log.records();
        records[0].params = serde_json::json!({"forged": true});
        assert!(matches!(
            verify_chain(&records),
            Err(AuditError::IntegrityViolation { index: 0 })
        ));
    }

    #[test]
    fn removed_record_fails_verification() {
        let log = AuditLog::new();
        log.append(record(1, PipelineStage::SpecDerived)).unwrap();
        log.append(record(1, PipelineStage::Generated)).unwrap();
        log.append(record(1, PipelineStage::Validated)).unwrap();

        let mut records = log.records();
        records.remove(1);
        assert!(matches!(
            verify_chain(&records),
            Err(AuditError::IntegrityViolation { index: 1 })
        ));
    }

    #[test]
    fn reordered_records_fail_verification() {
        let log = AuditLog::new();
        log.append(record(1, PipelineStage::SpecDerived)).unwrap();
        log.append(record(1, PipelineStage::Generated)).unwrap();

        let mut records = log.records();
        records.swap(0, 1);
        assert!(verify_chain(&records).is_err());
    }

    #[test]
    fn records_for_filters_by_job() {
        let log = AuditLog::new();
        log.append(record(1, PipelineStage::SpecDerived)).unwrap();
        log.append(AuditRecord::new(
            "INS_L1_P3_01".parse().unwrap(),
            "diverse-v1".parse().unwrap(),
            1,
            PipelineStage::SpecDerived,
            serde_json::json!({}),
        ))
        .unwrap();

        let filtered = log.records_for(
            &"INS_L1_P2_03".parse().unwrap(),
            &"gender-swap-client".parse().unwrap(),
        );
        assert_eq!(filtered.len(), 1);
    }
}
