//! Generation request/response wire contract
//!
//! The orchestrator treats all of these as opaque: conditioning strengths
//! and denoise values are dimensionless parameters in [0, 1] that only the
//! backend interprets.

use ari_panel::{Fingerprint, PanelId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structural-conditioning mechanism requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditioningMode {
    /// Edge-map conditioning — preserves line work precisely
    Canny,
    /// Line-art conditioning — general character panels
    Lineart,
    /// Pose-skeleton conditioning — preserves character poses
    Openpose,
}

impl ConditioningMode {
    /// Stable lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canny => "canny",
            Self::Lineart => "lineart",
            Self::Openpose => "openpose",
        }
    }
}

/// Structural-conditioning parameters for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditioningParams {
    /// Conditioning mechanism
    pub mode: ConditioningMode,
    /// Source panel whose composition constrains generation
    pub reference_panel: PanelId,
    /// Conditioning strength in [0, 1]
    pub strength: f64,
    /// Denoise strength in [0, 1]; working range 0.30-0.45 for characters
    pub denoise: f64,
}

/// A fully compiled generation request
///
/// Byte-identical for identical (spec, model) inputs; the fingerprint is the
/// dedup key over (panel id, policy id, spec content, model id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Content-addressed dedup fingerprint
    pub fingerprint: Fingerprint,
    /// Positive prompt text
    pub positive_prompt: String,
    /// Negative prompt text
    pub negative_prompt: String,
    /// Structural-conditioning parameters
    pub conditioning: ConditioningParams,
    /// Target backend/model identifier
    pub model_id: String,
}

/// Opaque reference to a generated artifact (storage is external)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    /// Create an artifact reference
    #[inline]
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// String form of the reference
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters the backend reports it actually used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoedParams {
    /// Conditioning strength applied
    pub strength: f64,
    /// Denoise strength applied
    pub denoise: f64,
    /// Model that produced the artifact
    pub model_id: String,
}

/// Successful backend response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Fingerprint of the originating request
    pub fingerprint: Fingerprint,
    /// Reference to the generated artifact
    pub artifact: ArtifactRef,
    /// Backend-echoed parameters
    pub params: EchoedParams,
    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
}
