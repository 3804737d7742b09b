//! ARI Variant Policies
//!
//! Policies, spec generation, and prompt compilation: the pure front half
//! of the pipeline that turns (panel metadata, variant policy) into a
//! backend-ready generation request.
//!
//! # Core Concepts
//!
//! - [`VariantPolicy`]: named, versioned demographic rule set (data, not code)
//! - [`SpecGenerator`] / [`TransformationSpec`]: policy resolution with
//!   locked attributes copied verbatim and sealed behind getters
//! - [`PromptBuilder`]: deterministic compilation into [`ari_backend::GenerationRequest`]
//!
//! # Invariant
//!
//! Identical (panel, policy, model) inputs produce byte-identical requests
//! and therefore identical fingerprints.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod policy;
mod prompt;
mod spec;

// Re-exports
pub use policy::{presets, ClothingOverride, PolicyError, RoleOverride, VariantPolicy};
pub use prompt::{conditioning_for, PromptBuilder, PromptError, NEGATIVE_PROMPT, STYLE_PROMPT};
pub use spec::{
    LockedAttributes, PolicyResolutionError, ResolvedSlot, SpecGenerator, TransformationSpec,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
