//! Variant policies
//!
//! A policy is data, not code: a named, versioned table mapping demographic
//! axes to target values per role, plus a name-substitution table. New
//! demographic presets are new policy files, never pipeline changes.

use ari_panel::{AgeBand, CharacterRole, EthnicityPresentation, GenderPresentation, PolicyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Clothing override with its declared role compatibility
///
/// A clothing change is only legal for roles the policy author marked
/// compatible; applying it elsewhere is a resolution error, not a silent
/// pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClothingOverride {
    /// Replacement clothing descriptor
    pub description: String,
    /// Roles this clothing is appropriate for
    pub compatible_roles: Vec<CharacterRole>,
}

/// Per-role demographic overrides
///
/// An axis left as `None` passes the source value through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleOverride {
    /// Target gender presentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<GenderPresentation>,
    /// Target ethnicity presentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<EthnicityPresentation>,
    /// Target age band
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<AgeBand>,
    /// Clothing override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clothing: Option<ClothingOverride>,
}

impl RoleOverride {
    /// Create an empty override (all axes pass through)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With gender target
    #[inline]
    #[must_use]
    pub fn with_gender(mut self, gender: GenderPresentation) -> Self {
        self.gender = Some(gender);
        self
    }

    /// With ethnicity target
    #[inline]
    #[must_use]
    pub fn with_ethnicity(mut self, ethnicity: EthnicityPresentation) -> Self {
        self.ethnicity = Some(ethnicity);
        self
    }

    /// With age target
    #[inline]
    #[must_use]
    pub fn with_age(mut self, age: AgeBand) -> Self {
        self.age = Some(age);
        self
    }

    /// With clothing override
    #[inline]
    #[must_use]
    pub fn with_clothing(mut self, clothing: ClothingOverride) -> Self {
        self.clothing = Some(clothing);
        self
    }

    /// Whether no axis is overridden
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gender.is_none()
            && self.ethnicity.is_none()
            && self.age.is_none()
            && self.clothing.is_none()
    }
}

/// A named, versioned demographic transformation rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPolicy {
    /// Policy identifier
    pub id: PolicyId,
    /// Policy version; bumped whenever override tables change
    pub version: u32,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Per-role demographic overrides
    pub overrides: BTreeMap<CharacterRole, RoleOverride>,
    /// Replacement character names per role; roles absent from the table
    /// keep their source names
    #[serde(default)]
    pub names: BTreeMap<CharacterRole, String>,
}

impl VariantPolicy {
    /// Create a new policy
    #[must_use]
    pub fn new(id: PolicyId, version: u32) -> Self {
        Self {
            id,
            version,
            description: String::new(),
            overrides: BTreeMap::new(),
            names: BTreeMap::new(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With a role override
    #[inline]
    #[must_use]
    pub fn with_override(mut self, role: CharacterRole, role_override: RoleOverride) -> Self {
        self.overrides.insert(role, role_override);
        self
    }

    /// With a name substitution
    #[inline]
    #[must_use]
    pub fn with_name(mut self, role: CharacterRole, name: impl Into<String>) -> Self {
        self.names.insert(role, name.into());
        self
    }

    /// Parse and validate a policy from YAML
    ///
    /// # Errors
    /// Returns [`PolicyError::Parse`] on malformed YAML and
    /// [`PolicyError::Invalid`] when the parsed policy fails validation
    pub fn from_yaml(yaml: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_yaml::from_str(yaml)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load and validate a policy from a YAML file
    ///
    /// # Errors
    /// Returns [`PolicyError::Io`] on read failure, otherwise as
    /// [`Self::from_yaml`]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Validate the policy at load time
    ///
    /// # Errors
    /// Returns [`PolicyError::Invalid`] when:
    /// - version is zero
    /// - no role override is defined
    /// - an override has every axis empty
    /// - a clothing override declares no compatible roles
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.version == 0 {
            return Err(PolicyError::Invalid("policy version must be >= 1".to_string()));
        }
        if self.overrides.is_empty() {
            return Err(PolicyError::Invalid(format!(
                "policy {} defines no role overrides",
                self.id
            )));
        }
        for (role, role_override) in &self.overrides {
            if role_override.is_empty() {
                return Err(PolicyError::Invalid(format!(
                    "policy {}: override for {} has no axes",
                    self.id,
                    role.as_str()
                )));
            }
            if let Some(clothing) = &role_override.clothing {
                if clothing.compatible_roles.is_empty() {
                    return Err(PolicyError::Invalid(format!(
                        "policy {}: clothing override for {} declares no compatible roles",
                        self.id,
                        role.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Policy load/validation errors
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Malformed YAML
    #[error("policy parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Structurally invalid policy
    #[error("invalid policy: {0}")]
    Invalid(String),

    /// File read failure
    #[error("policy file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Built-in policy presets mirroring the standard variant catalogue
pub mod presets {
    use super::*;

    fn policy_id(id: &str) -> PolicyId {
        // Preset ids are compile-time constants and always non-empty
        id.parse().unwrap_or_else(|_| unreachable!("preset id is non-empty"))
    }

    /// Client gender swap to female presentation
    #[must_use]
    pub fn gender_swap_client() -> VariantPolicy {
        VariantPolicy::new(policy_id("gender-swap-client"), 1)
            .with_description("Swap the client to female presentation")
            .with_override(
                CharacterRole::Client,
                RoleOverride::new().with_gender(GenderPresentation::Female),
            )
            .with_name(CharacterRole::Client, "Leah")
    }

    /// Therapist gender swap to female presentation
    #[must_use]
    pub fn gender_swap_therapist() -> VariantPolicy {
        VariantPolicy::new(policy_id("gender-swap-therapist"), 1)
            .with_description("Swap the therapist to female presentation")
            .with_override(
                CharacterRole::Therapist,
                RoleOverride::new().with_gender(GenderPresentation::Female),
            )
            .with_name(CharacterRole::Therapist, "Dr. Sarah")
    }

    /// Partner gender swap to male presentation
    #[must_use]
    pub fn gender_swap_partner() -> VariantPolicy {
        VariantPolicy::new(policy_id("gender-swap-partner"), 1)
            .with_description("Swap the partner to male presentation")
            .with_override(
                CharacterRole::Partner,
                RoleOverride::new().with_gender(GenderPresentation::Male),
            )
            .with_name(CharacterRole::Partner, "Alex")
    }

    /// Narrator gender swap to male presentation
    #[must_use]
    pub fn gender_swap_narrator() -> VariantPolicy {
        VariantPolicy::new(policy_id("gender-swap-narrator"), 1)
            .with_description("Swap the narrator to male presentation")
            .with_override(
                CharacterRole::Narrator,
                RoleOverride::new().with_gender(GenderPresentation::Male),
            )
            .with_name(CharacterRole::Narrator, "Robert")
    }

    /// Client ethnicity variant: South Asian presentation
    #[must_use]
    pub fn diverse_v1() -> VariantPolicy {
        VariantPolicy::new(policy_id("diverse-v1"), 1)
            .with_description("Client with South Asian presentation")
            .with_override(
                CharacterRole::Client,
                RoleOverride::new().with_ethnicity(EthnicityPresentation::new(
                    "medium brown",
                    "South Asian features",
                )),
            )
    }

    /// Client ethnicity variant: African presentation
    #[must_use]
    pub fn diverse_v2() -> VariantPolicy {
        VariantPolicy::new(policy_id("diverse-v2"), 1)
            .with_description("Client with African presentation")
            .with_override(
                CharacterRole::Client,
                RoleOverride::new().with_ethnicity(EthnicityPresentation::new(
                    "dark brown",
                    "African features",
                )),
            )
    }

    /// Client ethnicity variant: East Asian presentation
    #[must_use]
    pub fn diverse_v3() -> VariantPolicy {
        VariantPolicy::new(policy_id("diverse-v3"), 1)
            .with_description("Client with East Asian presentation")
            .with_override(
                CharacterRole::Client,
                RoleOverride::new().with_ethnicity(EthnicityPresentation::new(
                    "light",
                    "East Asian features",
                )),
            )
    }

    /// Younger client variant
    #[must_use]
    pub fn younger_client() -> VariantPolicy {
        VariantPolicy::new(policy_id("younger-client"), 1)
            .with_description("Client as a young adult")
            .with_override(
                CharacterRole::Client,
                RoleOverride::new().with_age(AgeBand::YoungAdult),
            )
    }

    /// Older client variant
    #[must_use]
    pub fn older_client() -> VariantPolicy {
        VariantPolicy::new(policy_id("older-client"), 1)
            .with_description("Client as a senior")
            .with_override(CharacterRole::Client, RoleOverride::new().with_age(AgeBand::Senior))
    }

    /// All built-in presets
    #[must_use]
    pub fn builtin() -> Vec<VariantPolicy> {
        vec![
            gender_swap_client(),
            gender_swap_therapist(),
            gender_swap_partner(),
            gender_swap_narrator(),
            diverse_v1(),
            diverse_v2(),
            diverse_v3(),
            younger_client(),
            older_client(),
        ]
    }
}
