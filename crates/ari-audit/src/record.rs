//! Audit record model
//!
//! Each record is keyed by (panel, policy, attempt, stage) and carries the
//! stage's parameters as opaque JSON plus a sha-256 hash chained to the
//! previous record. The chain makes tampering and reordering detectable.

use ari_panel::{PanelId, PolicyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ulid::Ulid;

/// Pipeline stage an audit record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Transformation spec derived
    SpecDerived,
    /// Generation request compiled
    RequestCompiled,
    /// Backend invocation finished (success or terminal failure)
    Generated,
    /// Validation report produced
    Validated,
    /// Workflow state changed
    ReviewTransition,
    /// Clinician decision recorded
    ReviewDecision,
    /// Review SLA exceeded; priority escalated
    ReviewEscalated,
    /// Final artifact (variant or fallback) delivered
    Delivered,
    /// Job cancelled
    Cancelled,
}

impl PipelineStage {
    /// Stable lowercase label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpecDerived => "spec_derived",
            Self::RequestCompiled => "request_compiled",
            Self::Generated => "generated",
            Self::Validated => "validated",
            Self::ReviewTransition => "review_transition",
            Self::ReviewDecision => "review_decision",
            Self::ReviewEscalated => "review_escalated",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Sortable record id
    pub id: Ulid,
    /// Record timestamp
    pub timestamp: DateTime<Utc>,
    /// Panel being transformed
    pub panel: PanelId,
    /// Policy being applied
    pub policy: PolicyId,
    /// Generation attempt number, starting at 1
    pub attempt: u32,
    /// Stage this record describes
    pub stage: PipelineStage,
    /// Stage parameters, opaque JSON
    pub params: serde_json::Value,
    /// Hash of the previous record (all zero for the first)
    #[serde(with = "hex_bytes")]
    pub prev_hash: [u8; 32],
    /// Hash of this record
    #[serde(with = "hex_bytes")]
    pub hash: [u8; 32],
}

impl AuditRecord {
    /// Create an unchained record; the log fills in the chain on append
    #[must_use]
    pub fn new(
        panel: PanelId,
        policy: PolicyId,
        attempt: u32,
        stage: PipelineStage,
        params: serde_json::Value,
    ) -> Self {
        Self {
            id: Ulid::new(),
            timestamp: Utc::now(),
            panel,
            policy,
            attempt,
            stage,
            params,
            prev_hash: [0u8; 32],
            hash: [0u8; 32],
        }
    }

    /// Compute this record's chain hash from its content and `prev_hash`
    #[must_use]
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.id.to_string().as_bytes());
        hasher.update(self.timestamp.timestamp_micros().to_le_bytes());
        hasher.update(self.panel.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.policy.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.attempt.to_le_bytes());
        hasher.update(self.stage.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.params.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(self.prev_hash);
        hasher.finalize().into()
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 32], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(de)?;
        let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}
