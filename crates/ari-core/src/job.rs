//! Job model and cancellation

use ari_backend::ArtifactRef;
use ari_panel::{PanelId, PanelMetadata};
use ari_policy::VariantPolicy;
use ari_review::ValidationReport;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ulid::Ulid;

/// Sortable job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Ulid);

impl JobId {
    /// Mint a fresh job id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of work: a (panel, policy) variant to produce
#[derive(Debug, Clone)]
pub struct VariantJob {
    /// Job identifier
    pub id: JobId,
    /// Source panel metadata
    pub panel: PanelMetadata,
    /// Policy to apply
    pub policy: VariantPolicy,
}

impl VariantJob {
    /// Create a job with a fresh id
    #[must_use]
    pub fn new(panel: PanelMetadata, policy: VariantPolicy) -> Self {
        Self {
            id: JobId::new(),
            panel,
            policy,
        }
    }
}

/// Why the canonical panel was delivered instead of a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Generation failed after bounded retries
    GenerationFailed,
    /// Backend rejected the request outright
    GenerationRejected,
    /// Validation auto-rejected (locked content or safety)
    AutoRejected,
    /// A clinician rejected the variant
    ClinicianRejected,
    /// Regeneration attempts exhausted
    AttemptsExhausted,
}

/// Terminal result of one job
///
/// Delivery never sees a failure: every resolved job carries either the
/// approved variant or the canonical panel.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Variant approved and delivered
    Approved {
        /// The approved artifact
        artifact: ArtifactRef,
        /// The validation report it was approved under
        report: ValidationReport,
    },
    /// Canonical panel delivered as fallback
    Fallback {
        /// The canonical panel delivered
        canonical: PanelId,
        /// Why the variant was not delivered
        reason: FallbackReason,
    },
    /// Job cancelled; nothing delivered
    Cancelled,
}

/// Cooperative cancellation handle
///
/// Checked between pipeline stages; an in-flight stage runs to completion
/// and its result is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an active (non-cancelled) token
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn job_ids_are_unique_and_time_sortable() {
        let a = JobId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = JobId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }
}
