//! Generation fingerprints
//!
//! A [`Fingerprint`] identifies one unit of generation work: the same
//! panel, policy, resolved spec, and backend model always fold to the
//! same 32 bytes, which is what lets the orchestrator deduplicate and
//! coalesce identical requests.

use crate::id::{PanelId, PolicyId};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Field separator inside the fingerprint preimage, so adjacent fields
/// cannot shift content into one another.
const FIELD_BOUNDARY: &[u8] = b"\x00";

/// Blake3 digest over the generation dedup key
///
/// Rendered as 64 lowercase hex chars in text and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fold the dedup key (panel, policy, spec content, model) into a
    /// fingerprint.
    ///
    /// The spec is JSON-encoded; the ids and model are hashed as their
    /// text forms, each field terminated by a zero byte.
    ///
    /// # Errors
    /// Returns [`FingerprintError::SpecEncoding`] if the spec cannot be
    /// JSON-encoded.
    pub fn for_generation<S>(
        panel: &PanelId,
        policy: &PolicyId,
        spec: &S,
        model_id: &str,
    ) -> Result<Self, FingerprintError>
    where
        S: Serialize,
    {
        let spec_json = serde_json::to_vec(spec)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(panel.as_str().as_bytes());
        hasher.update(FIELD_BOUNDARY);
        hasher.update(policy.as_str().as_bytes());
        hasher.update(FIELD_BOUNDARY);
        hasher.update(&spec_json);
        hasher.update(FIELD_BOUNDARY);
        hasher.update(model_id.as_bytes());
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    /// Digest arbitrary bytes into a fingerprint
    ///
    /// Mainly useful for minting distinct fingerprints outside the
    /// generation path (fixtures, cache probes in stats).
    #[inline]
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// First 16 hex chars, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s)?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|rest: Vec<u8>| FingerprintError::WrongLength(rest.len()))?;
        Ok(Self(bytes))
    }
}

// Hex string in every serde format; the audit trail and wire contract
// are JSONL/JSON, so there is no binary path to optimize for.
impl Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Fingerprint construction and parsing failures
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Hex text decoded to the wrong number of bytes
    #[error("fingerprint must be 32 bytes, decoded {0}")]
    WrongLength(usize),

    /// Text was not valid hex
    #[error("fingerprint is not valid hex: {0}")]
    NotHex(#[from] hex::FromHexError),

    /// Spec could not be JSON-encoded for hashing
    #[error("spec could not be encoded for fingerprinting: {0}")]
    SpecEncoding(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct FakeSpec {
        policy_version: u32,
        summary: &'static str,
    }

    fn ids() -> (PanelId, PolicyId) {
        ("INS_L1_P3_01".parse().unwrap(), "gender_swap_v1".parse().unwrap())
    }

    #[test]
    fn same_dedup_key_same_fingerprint() {
        let (panel, policy) = ids();
        let spec = FakeSpec {
            policy_version: 1,
            summary: "swap client gender",
        };
        let a = Fingerprint::for_generation(&panel, &policy, &spec, "sd-xl-anim-v2").unwrap();
        let b = Fingerprint::for_generation(&panel, &policy, &spec, "sd-xl-anim-v2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_key_field_feeds_the_fingerprint() {
        let (panel, policy) = ids();
        let other_panel: PanelId = "INS_L1_P4_02".parse().unwrap();
        let other_policy: PolicyId = "diverse_v1".parse().unwrap();
        let spec = FakeSpec {
            policy_version: 1,
            summary: "swap client gender",
        };
        let bumped = FakeSpec {
            policy_version: 2,
            summary: "swap client gender",
        };

        let base = Fingerprint::for_generation(&panel, &policy, &spec, "sd-xl-anim-v2").unwrap();
        assert_ne!(
            base,
            Fingerprint::for_generation(&other_panel, &policy, &spec, "sd-xl-anim-v2").unwrap()
        );
        assert_ne!(
            base,
            Fingerprint::for_generation(&panel, &other_policy, &spec, "sd-xl-anim-v2").unwrap()
        );
        assert_ne!(
            base,
            Fingerprint::for_generation(&panel, &policy, &bumped, "sd-xl-anim-v2").unwrap()
        );
        assert_ne!(
            base,
            Fingerprint::for_generation(&panel, &policy, &spec, "sd-xl-anim-v3").unwrap()
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let fp = Fingerprint::digest(b"panel content");
        let text = fp.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<Fingerprint>().unwrap(), fp);
    }

    #[test]
    fn parse_rejects_bad_text() {
        assert!(matches!(
            "zz".repeat(32).parse::<Fingerprint>(),
            Err(FingerprintError::NotHex(_))
        ));
        assert!(matches!(
            "abcd".parse::<Fingerprint>(),
            Err(FingerprintError::WrongLength(2))
        ));
    }

    #[test]
    fn serde_uses_hex_text() {
        let fp = Fingerprint::digest(b"panel content");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{fp}\""));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn short_is_a_prefix_of_display() {
        let fp = Fingerprint::digest(b"panel content");
        assert_eq!(fp.short().len(), 16);
        assert!(fp.to_string().starts_with(&fp.short()));
    }
}
