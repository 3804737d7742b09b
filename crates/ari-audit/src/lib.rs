//! ARI Audit
//!
//! Append-only, hash-chained audit trail for every pipeline stage.
//!
//! # Core Concepts
//!
//! - [`AuditRecord`]: (panel, policy, attempt, stage) + opaque JSON params,
//!   sha-256 chained to the previous record
//! - [`AuditLog`]: thread-safe append-only log; the pipeline's sole history
//! - [`AuditSink`] / [`JsonlSink`]: durable write-through, reloadable with
//!   chain verification for resume
//!
//! # Invariant
//!
//! Any tamper, removal, or reorder of records breaks chain verification.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod log;
mod record;
mod sink;

// Re-exports
pub use log::{verify_chain, AuditError, AuditLog};
pub use record::{AuditRecord, PipelineStage};
pub use sink::{load_jsonl, AuditSink, JsonlSink};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
