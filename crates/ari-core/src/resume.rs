//! Resume from the audit trail
//!
//! The audit log is the sole history holder; the current state of any job
//! is a fold over its records. No separate checkpoint format exists.

use ari_audit::{AuditRecord, PipelineStage};

/// Where a job stands according to its audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// No records: the job never started
    NotStarted,
    /// Job in flight; restart after the named stage
    InProgress {
        /// Last completed stage
        stage: PipelineStage,
        /// Attempt it belonged to
        attempt: u32,
    },
    /// Job already resolved; nothing to do
    Resolved {
        /// Terminal stage reached
        stage: PipelineStage,
    },
}

/// Fold a job's audit records to its resume point
///
/// Records must be in append order, as returned by
/// [`ari_audit::AuditLog::records_for`] or reloaded from a sink.
#[must_use]
pub fn resume_stage(records: &[AuditRecord]) -> ResumePoint {
    match records.last() {
        None => ResumePoint::NotStarted,
        Some(last) => match last.stage {
            PipelineStage::Delivered | PipelineStage::Cancelled => {
                ResumePoint::Resolved { stage: last.stage }
            }
            stage => ResumePoint::InProgress {
                stage,
                attempt: last.attempt,
            },
        },
    }
}
