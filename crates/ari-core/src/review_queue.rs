//! Human review queue
//!
//! Flagged variants wait here for a clinician. The queue exposes pending
//! cases with their reports; accepting a [`ReviewRecord`] is the only
//! external mutation. SLA handling escalates priority once and keeps
//! waiting — a flagged variant is never auto-resolved.

use crate::job::JobId;
use ari_backend::ArtifactRef;
use ari_panel::{PanelId, PolicyId};
use ari_policy::TransformationSpec;
use ari_review::{ReviewRecord, ValidationReport};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;

/// Review priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReviewPriority {
    /// Within SLA
    Normal,
    /// SLA exceeded
    Escalated,
}

/// One case awaiting clinician review
#[derive(Debug, Clone)]
pub struct ReviewCase {
    /// Job the case belongs to
    pub job: JobId,
    /// Panel being transformed
    pub panel: PanelId,
    /// Policy applied
    pub policy: PolicyId,
    /// Generation attempt under review
    pub attempt: u32,
    /// Artifact to inspect
    pub artifact: ArtifactRef,
    /// The spec the variant was generated under
    pub spec: TransformationSpec,
    /// Why the variant was flagged
    pub report: ValidationReport,
    /// When the case entered the queue
    pub enqueued_at: DateTime<Utc>,
    /// Current priority
    pub priority: ReviewPriority,
}

struct Pending {
    case: ReviewCase,
    tx: oneshot::Sender<ReviewRecord>,
}

/// Review queue failure
#[derive(Debug, thiserror::Error)]
pub enum ReviewQueueError {
    /// No pending case for the job
    #[error("no pending review for job {job}")]
    UnknownJob {
        /// Requested job
        job: JobId,
    },

    /// The waiting pipeline side went away
    #[error("review consumer gone for job {job}")]
    ConsumerGone {
        /// Affected job
        job: JobId,
    },
}

/// Queue of variants awaiting human review
#[derive(Default)]
pub struct ReviewQueue {
    pending: DashMap<JobId, Pending>,
}

impl ReviewQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a flagged case; the pipeline awaits the returned receiver
    pub(crate) fn enqueue(&self, case: ReviewCase) -> oneshot::Receiver<ReviewRecord> {
        let (tx, rx) = oneshot::channel();
        tracing::info!(job = %case.job, panel = %case.panel, "variant queued for review");
        self.pending.insert(case.job, Pending { case, tx });
        rx
    }

    /// Snapshot of pending cases, escalated first, then oldest first
    #[must_use]
    pub fn pending(&self) -> Vec<ReviewCase> {
        let mut cases: Vec<ReviewCase> =
            self.pending.iter().map(|entry| entry.case.clone()).collect();
        cases.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.enqueued_at.cmp(&b.enqueued_at))
        });
        cases
    }

    /// Number of cases waiting
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no cases are waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Escalate a case past its SLA; returns false if already escalated
    /// or unknown
    pub(crate) fn escalate(&self, job: JobId) -> bool {
        match self.pending.get_mut(&job) {
            Some(mut entry) if entry.case.priority == ReviewPriority::Normal => {
                entry.case.priority = ReviewPriority::Escalated;
                tracing::warn!(%job, "review SLA exceeded, case escalated");
                true
            }
            _ => false,
        }
    }

    /// Resolve a pending case with a clinician decision
    ///
    /// # Errors
    /// Returns [`ReviewQueueError::UnknownJob`] for an unknown job and
    /// [`ReviewQueueError::ConsumerGone`] if the pipeline stopped waiting
    pub fn resolve(&self, job: JobId, record: ReviewRecord) -> Result<(), ReviewQueueError> {
        let (_, entry) = self
            .pending
            .remove(&job)
            .ok_or(ReviewQueueError::UnknownJob { job })?;
        entry
            .tx
            .send(record)
            .map_err(|_| ReviewQueueError::ConsumerGone { job })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ari_panel::{
        AgeBand, CharacterRole, CharacterSlot, Demographics, EmotionBand, EthnicityPresentation,
        GenderPresentation, PanelCategory, PanelMetadata, SceneDescription, SpatialSlot,
    };
    use ari_policy::{presets, SpecGenerator};
    use ari_review::{ReviewDecision, ValidationReport, Verdict};

    fn spec() -> TransformationSpec {
        let panel = PanelMetadata::new(
            "INS_L1_P2_03".parse().unwrap(),
            PanelCategory::ClientSingle,
            SceneDescription::new("scene", "setting", "light", "mood"),
        )
        .with_slot(
            CharacterSlot::new(
                CharacterRole::Client,
                "Leo",
                SpatialSlot::Center,
                EmotionBand::Neutral,
                Demographics {
                    gender: GenderPresentation::Male,
                    ethnicity: EthnicityPresentation::new("light", "European features"),
                    age: AgeBand::MiddleAged,
                },
            )
            .with_pose("sitting"),
        );
        SpecGenerator::new()
            .derive(&panel, &presets::gender_swap_client())
            .unwrap()
    }

    fn case(job: JobId) -> ReviewCase {
        ReviewCase {
            job,
            panel: "INS_L1_P2_03".parse().unwrap(),
            policy: "gender-swap-client".parse().unwrap(),
            attempt: 1,
            artifact: ArtifactRef::new("stub://artifact"),
            spec: spec(),
            report: ValidationReport {
                checks: vec![],
                verdict: Verdict::Flagged,
            },
            enqueued_at: Utc::now(),
            priority: ReviewPriority::Normal,
        }
    }

    #[tokio::test]
    async fn resolve_delivers_decision_to_waiter() {
        let queue = ReviewQueue::new();
        let job = JobId::new();
        let rx = queue.enqueue(case(job));

        let record = ReviewRecord::clinician("dr-chen", ReviewDecision::Approve, "fine");
        queue.resolve(job, record.clone()).unwrap();

        assert_eq!(rx.await.unwrap(), record);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn resolve_unknown_job_errors() {
        let queue = ReviewQueue::new();
        let record = ReviewRecord::clinician("dr-chen", ReviewDecision::Approve, "");
        assert!(matches!(
            queue.resolve(JobId::new(), record),
            Err(ReviewQueueError::UnknownJob { .. })
        ));
    }

    #[tokio::test]
    async fn escalated_cases_sort_first() {
        let queue = ReviewQueue::new();
        let first = JobId::new();
        let second = JobId::new();
        let _rx1 = queue.enqueue(case(first));
        let _rx2 = queue.enqueue(case(second));

        assert!(queue.escalate(second));
        // Second escalation is a no-op
        assert!(!queue.escalate(second));

        let pending = queue.pending();
        assert_eq!(pending[0].job, second);
        assert_eq!(pending[0].priority, ReviewPriority::Escalated);
        assert_eq!(pending[1].job, first);
    }
}
