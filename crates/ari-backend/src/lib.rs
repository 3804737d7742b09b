//! ARI Generation Backend
//!
//! The request/response contract with the external image-generation
//! capability, and the orchestrator that manages calls to it.
//!
//! # Core Concepts
//!
//! - [`GenerationRequest`] / [`GenerationResult`]: the opaque wire contract
//! - [`GenerationBackend`]: async seam implemented by real backends
//! - [`GenerationOrchestrator`]: dedup, bounded retries, per-attempt
//!   deadlines, and per-fingerprint coalescing
//!
//! # Invariant
//!
//! At most one backend call is in flight per fingerprint at any time;
//! concurrent submitters coalesce and read the shared result.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod backend;
mod orchestrator;
mod request;

// Re-exports
pub use backend::{BackendError, GenerationBackend};
pub use orchestrator::{
    GenerationError, GenerationOrchestrator, OrchestratorConfig, OrchestratorStats,
};
pub use request::{
    ArtifactRef, ConditioningMode, ConditioningParams, EchoedParams, GenerationRequest,
    GenerationResult,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
