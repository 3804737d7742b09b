//! Identifier newtypes for panels and variant policies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical panel identifier (e.g. `INS_L1_P2_03`)
///
/// Assigned upstream when the canonical catalogue is ingested; treated as
/// opaque by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(String);

impl PanelId {
    /// Create a panel id
    ///
    /// # Errors
    /// Returns [`IdError::Empty`] when the identifier is blank
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::Empty { kind: "panel" });
        }
        Ok(Self(id))
    }

    /// String form of the identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PanelId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Named variant policy identifier (e.g. `gender-swap-client`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    /// Create a policy id
    ///
    /// # Errors
    /// Returns [`IdError::Empty`] when the identifier is blank
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::Empty { kind: "policy" });
        }
        Ok(Self(id))
    }

    /// String form of the identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PolicyId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier construction errors
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Blank identifier
    #[error("empty {kind} identifier")]
    Empty { kind: &'static str },
}
