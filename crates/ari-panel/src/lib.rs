//! ARI Panel Model
//!
//! Typed metadata for canonical therapy-course panels and the content
//! fingerprinting used to deduplicate generation requests.
//!
//! # Core Concepts
//!
//! - [`PanelMetadata`]: immutable upstream record of a panel's locked and
//!   adaptable attributes
//! - [`CharacterSlot`]: one character position with locked pose/emotion and
//!   adaptable demographics
//! - [`LockedRegion`]: diagram/text content that must never be regenerated
//! - [`Fingerprint`]: 32-byte Blake3 hash for request deduplication
//!
//! # Example
//!
//! ```rust,ignore
//! use ari_panel::{PanelMetadata, PanelCategory, SceneDescription};
//!
//! let panel = PanelMetadata::new(
//!     "INS_L1_P2_03".parse()?,
//!     PanelCategory::DialogueDomestic,
//!     SceneDescription::new("Leo and Ali discuss his sleep", "bedroom", "warm", "concerned"),
//! );
//! panel.validate()?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod fingerprint;
mod id;
mod metadata;

// Re-exports
pub use fingerprint::{Fingerprint, FingerprintError};
pub use id::{IdError, PanelId, PolicyId};
pub use metadata::{
    AgeBand, CharacterRole, CharacterSlot, Demographics, EmotionBand, EthnicityPresentation,
    GenderPresentation, InvalidMetadata, LockedRegion, LockedRegionKind, PanelCategory,
    PanelMetadata, SceneDescription, SpatialSlot,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
