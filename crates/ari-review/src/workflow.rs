//! Approval workflow state machine
//!
//! Every generated variant moves through an explicit FSM with a fixed
//! transition table. Illegal transitions are rejected with
//! [`TransitionError`], never silently ignored; history is kept in order
//! for audit.

use crate::validator::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Variant generated, awaiting validation
    Generated,
    /// Validation passed; awaiting automatic approval
    AutoPassed,
    /// Validation flagged; awaiting human review
    Flagged,
    /// Validation rejected; no review possible
    AutoRejected,
    /// A clinician has the variant open
    UnderReview,
    /// Terminal: variant approved for delivery
    Approved,
    /// Terminal: variant rejected, fallback delivered
    Rejected,
    /// Clinician requested another attempt
    RegenerationRequested,
    /// Terminal: job cancelled before resolution
    Cancelled,
}

impl ReviewState {
    /// Stable lowercase label for audit records
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::AutoPassed => "auto_passed",
            Self::Flagged => "flagged",
            Self::AutoRejected => "auto_rejected",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RegenerationRequested => "regeneration_requested",
            Self::Cancelled => "cancelled",
        }
    }

    /// States reachable from this one
    #[must_use]
    pub fn allowed_transitions(&self) -> &'static [ReviewState] {
        match self {
            Self::Generated => &[
                Self::AutoPassed,
                Self::Flagged,
                Self::AutoRejected,
                Self::Cancelled,
            ],
            Self::AutoPassed => &[Self::Approved, Self::Cancelled],
            Self::Flagged => &[Self::UnderReview, Self::Cancelled],
            Self::UnderReview => &[Self::Approved, Self::Rejected, Self::RegenerationRequested],
            Self::AutoRejected => &[Self::Rejected],
            Self::RegenerationRequested => &[Self::Generated, Self::Rejected],
            Self::Approved | Self::Rejected | Self::Cancelled => &[],
        }
    }

    /// Whether this state admits no further transitions
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Validate one transition against the table
    ///
    /// # Errors
    /// Returns [`TransitionError::Invalid`] for any pair not in the table
    pub fn validate_transition(from: Self, to: Self) -> Result<(), TransitionError> {
        if from.allowed_transitions().contains(&to) {
            Ok(())
        } else {
            Err(TransitionError::Invalid { from, to })
        }
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Illegal workflow operation
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransitionError {
    /// Transition not in the table
    #[error("invalid transition: {from} -> {to}")]
    Invalid {
        /// Current state
        from: ReviewState,
        /// Requested state
        to: ReviewState,
    },

    /// Decision applied while not under review
    #[error("review decision in state {state}; variant is not under review")]
    NotUnderReview {
        /// Actual state
        state: ReviewState,
    },
}

/// Who produced a review decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// Validator pipeline
    Automated,
    /// Human clinician
    Clinician,
}

/// A clinician's decision on a flagged variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Accept the variant for delivery
    Approve,
    /// Reject; deliver the canonical fallback
    Reject,
    /// Request another generation attempt
    RequestRegeneration,
}

/// Record of one review decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Decision origin
    pub source: VerdictSource,
    /// The decision
    pub decision: ReviewDecision,
    /// Free-text rationale
    pub rationale: String,
    /// Reviewer identifier
    pub reviewer: String,
    /// Decision timestamp
    pub timestamp: DateTime<Utc>,
}

impl ReviewRecord {
    /// Record a clinician decision now
    #[must_use]
    pub fn clinician(
        reviewer: impl Into<String>,
        decision: ReviewDecision,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            source: VerdictSource::Clinician,
            decision,
            rationale: rationale.into(),
            reviewer: reviewer.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One workflow state change, timestamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// State entered
    pub state: ReviewState,
    /// When it was entered
    pub at: DateTime<Utc>,
}

/// Workflow instance for one variant
///
/// Holds the current state plus ordered history. All mutation goes through
/// the transition table; terminal states are final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewWorkflow {
    state: ReviewState,
    history: Vec<StateChange>,
}

impl ReviewWorkflow {
    /// Start a workflow for a freshly generated variant
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ReviewState::Generated,
            history: vec![StateChange {
                state: ReviewState::Generated,
                at: Utc::now(),
            }],
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ReviewState {
        self.state
    }

    /// Ordered state history
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    /// Whether the workflow has reached a terminal state
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.state.is_terminal()
    }

    fn transition_to(&mut self, next: ReviewState) -> Result<(), TransitionError> {
        ReviewState::validate_transition(self.state, next)?;
        tracing::debug!(from = %self.state, to = %next, "workflow transition");
        self.state = next;
        self.history.push(StateChange {
            state: next,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Apply a validation verdict to a generated variant
    ///
    /// AutoPass transitions through `AutoPassed` directly to `Approved`;
    /// AutoReject transitions through `AutoRejected` to `Rejected` (the
    /// fallback path). Flagged waits for review.
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless the workflow is in `Generated`
    pub fn apply_verdict(&mut self, verdict: Verdict) -> Result<(), TransitionError> {
        match verdict {
            Verdict::AutoPass => {
                self.transition_to(ReviewState::AutoPassed)?;
                self.transition_to(ReviewState::Approved)
            }
            Verdict::Flagged => self.transition_to(ReviewState::Flagged),
            Verdict::AutoReject => {
                self.transition_to(ReviewState::AutoRejected)?;
                self.transition_to(ReviewState::Rejected)
            }
        }
    }

    /// Move a flagged variant under active review
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless the workflow is in `Flagged`
    pub fn begin_review(&mut self) -> Result<(), TransitionError> {
        self.transition_to(ReviewState::UnderReview)
    }

    /// Apply a clinician decision to a variant under review
    ///
    /// # Errors
    /// Returns [`TransitionError::NotUnderReview`] outside `UnderReview`
    pub fn apply_decision(&mut self, record: &ReviewRecord) -> Result<(), TransitionError> {
        if self.state != ReviewState::UnderReview {
            return Err(TransitionError::NotUnderReview { state: self.state });
        }
        let next = match record.decision {
            ReviewDecision::Approve => ReviewState::Approved,
            ReviewDecision::Reject => ReviewState::Rejected,
            ReviewDecision::RequestRegeneration => ReviewState::RegenerationRequested,
        };
        self.transition_to(next)
    }

    /// Restart generation after a regeneration request
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless in `RegenerationRequested`
    pub fn restart(&mut self) -> Result<(), TransitionError> {
        self.transition_to(ReviewState::Generated)
    }

    /// Force rejection when regeneration attempts are exhausted
    ///
    /// # Errors
    /// Returns [`TransitionError`] unless in `RegenerationRequested`
    pub fn exhaust_attempts(&mut self) -> Result<(), TransitionError> {
        self.transition_to(ReviewState::Rejected)
    }

    /// Cancel an unresolved workflow
    ///
    /// # Errors
    /// Returns [`TransitionError`] from states that do not admit
    /// cancellation (terminal states and active review)
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.transition_to(ReviewState::Cancelled)
    }
}

impl Default for ReviewWorkflow {
    fn default() -> Self {
        Self::new()
    }
}
