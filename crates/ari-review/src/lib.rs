//! ARI Review
//!
//! Validation and approval for generated variants.
//!
//! # Core Concepts
//!
//! - [`PanelScorer`]: async seam to the external vision scoring capability
//! - [`Validator`]: pure threshold evaluation producing a [`ValidationReport`]
//! - [`ReviewWorkflow`]: explicit approval FSM with a closed transition table
//!
//! # Invariant
//!
//! Verdict precedence is Reject > Flag > Pass, computed from check outcomes
//! and structurally unoverridable; a locked-content violation can never be
//! approved.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod validator;
mod workflow;

// Re-exports
pub use validator::{
    CheckKind, CheckOutcome, CheckScores, CheckStatus, PanelScorer, RegionCheck, ScorerError,
    SlotEmotion, ValidationReport, Validator, ValidatorConfig, Verdict,
};
pub use workflow::{
    ReviewDecision, ReviewRecord, ReviewState, ReviewWorkflow, StateChange, TransitionError,
    VerdictSource,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
