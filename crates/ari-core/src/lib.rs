//! ARI Core
//!
//! The variant pipeline: adaptive re-illustration of therapy-course panels
//! under demographic variant policies, with validation, human review, audit,
//! and a canonical-panel fallback guarantee.
//!
//! # Core Concepts
//!
//! - [`VariantJob`] / [`JobOutcome`]: one (panel, policy) unit of work and
//!   its terminal result — approved variant, canonical fallback, or cancelled
//! - [`Pipeline`]: strictly ordered stages, every transition audited
//! - [`WorkerPool`]: bounded concurrency over independent jobs
//! - [`ReviewQueue`]: flagged variants awaiting a clinician
//! - [`resume_stage`]: event-sourced restart from the audit trail

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod config;
mod error;
mod job;
mod pipeline;
mod resume;
mod review_queue;
mod worker;

// Re-exports
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use job::{CancelToken, FallbackReason, JobId, JobOutcome, VariantJob};
pub use pipeline::Pipeline;
pub use resume::{resume_stage, ResumePoint};
pub use review_queue::{ReviewCase, ReviewPriority, ReviewQueue, ReviewQueueError};
pub use worker::WorkerPool;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
