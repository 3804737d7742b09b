//! Pipeline error taxonomy
//!
//! Only fatal, operator-facing failures surface here. Generation failures
//! and rejections resolve to fallback outcomes, not errors.

use ari_audit::AuditError;
use ari_policy::{PolicyResolutionError, PromptError};
use ari_review::{ScorerError, TransitionError};

/// Fatal pipeline failure
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed upstream metadata or an unresolvable policy
    #[error(transparent)]
    PolicyResolution(#[from] PolicyResolutionError),

    /// Prompt compilation failed
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Vision scorer infrastructure failure
    #[error(transparent)]
    Scorer(#[from] ScorerError),

    /// Workflow invariant violated — indicates a pipeline bug
    #[error(transparent)]
    Workflow(#[from] TransitionError),

    /// Audit trail could not be written
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Review queue entry disappeared without a decision
    #[error("review abandoned for job {job}")]
    ReviewAbandoned {
        /// Affected job
        job: crate::job::JobId,
    },

    /// Worker task for the job panicked before producing an outcome
    #[error("worker task for job {job} panicked")]
    JobPanicked {
        /// Affected job
        job: crate::job::JobId,
    },

    /// Resolved audit trail is missing the data needed to replay its outcome
    #[error("audit trail for panel {panel} is incomplete: {detail}")]
    TrailIncomplete {
        /// Panel whose trail was folded
        panel: ari_panel::PanelId,
        /// What was missing
        detail: &'static str,
    },
}
