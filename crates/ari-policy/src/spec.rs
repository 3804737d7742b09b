//! Transformation spec generation
//!
//! Pure derivation of a [`TransformationSpec`] from panel metadata plus a
//! variant policy. Locked attributes are copied verbatim and held behind
//! private fields; nothing downstream can alter them, and the spec carries
//! no deserialization surface so it can only ever be derived, never loaded.

use crate::policy::{PolicyError, RoleOverride, VariantPolicy};
use ari_panel::{
    CharacterRole, CharacterSlot, Demographics, EmotionBand, LockedRegion, PanelCategory,
    PanelId, PolicyId, SceneDescription, SpatialSlot,
};
use serde::Serialize;

/// Attributes copied verbatim from the source panel
///
/// Read-only by construction: private fields, getters only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockedAttributes {
    category: PanelCategory,
    scene: SceneDescription,
    regions: Vec<LockedRegion>,
    speech_bubbles: Vec<String>,
    therapeutic_intent: String,
    clinical_review: bool,
}

impl LockedAttributes {
    pub(crate) fn from_metadata(panel: &ari_panel::PanelMetadata) -> Self {
        Self {
            category: panel.category,
            scene: panel.scene.clone(),
            regions: panel.locked_regions.clone(),
            speech_bubbles: panel.speech_bubbles.clone(),
            therapeutic_intent: panel.therapeutic_intent.clone(),
            clinical_review: panel.requires_clinical_review,
        }
    }

    /// Panel category
    #[inline]
    #[must_use]
    pub fn category(&self) -> PanelCategory {
        self.category
    }

    /// Scene descriptors
    #[inline]
    #[must_use]
    pub fn scene(&self) -> &SceneDescription {
        &self.scene
    }

    /// Locked regions
    #[inline]
    #[must_use]
    pub fn regions(&self) -> &[LockedRegion] {
        &self.regions
    }

    /// Speech bubble text, verbatim
    #[inline]
    #[must_use]
    pub fn speech_bubbles(&self) -> &[String] {
        &self.speech_bubbles
    }

    /// Therapeutic-intent description
    #[inline]
    #[must_use]
    pub fn therapeutic_intent(&self) -> &str {
        &self.therapeutic_intent
    }

    /// Whether the panel demands the tighter clinical threshold
    #[inline]
    #[must_use]
    pub fn clinical_review(&self) -> bool {
        self.clinical_review
    }
}

/// One character slot after policy resolution
///
/// Pose, expression, emotion, spatial slot, and speaking flag come verbatim
/// from the source; name, demographics, and clothing are the resolved
/// values. Axis flags record which axes the policy actually changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSlot {
    role: CharacterRole,
    slot: SpatialSlot,
    pose: String,
    expression: String,
    emotion: EmotionBand,
    is_speaking: bool,
    name: String,
    demographics: Demographics,
    clothing: String,
    gender_changed: bool,
    ethnicity_changed: bool,
    age_changed: bool,
}

impl ResolvedSlot {
    fn resolve(
        source: &CharacterSlot,
        role_override: Option<&RoleOverride>,
        name_override: Option<&String>,
    ) -> Self {
        let mut demographics = source.demographics.clone();
        let mut clothing = source.clothing.clone();
        let mut gender_changed = false;
        let mut ethnicity_changed = false;
        let mut age_changed = false;

        if let Some(ov) = role_override {
            if let Some(gender) = ov.gender {
                gender_changed = gender != demographics.gender;
                demographics.gender = gender;
            }
            if let Some(ethnicity) = &ov.ethnicity {
                ethnicity_changed = *ethnicity != demographics.ethnicity;
                demographics.ethnicity = ethnicity.clone();
            }
            if let Some(age) = ov.age {
                age_changed = age != demographics.age;
                demographics.age = age;
            }
            if let Some(clothing_override) = &ov.clothing {
                clothing = clothing_override.description.clone();
            }
        }

        Self {
            role: source.role,
            slot: source.slot,
            pose: source.pose.clone(),
            expression: source.expression.clone(),
            emotion: source.emotion,
            is_speaking: source.is_speaking,
            name: name_override.cloned().unwrap_or_else(|| source.name.clone()),
            demographics,
            clothing,
            gender_changed,
            ethnicity_changed,
            age_changed,
        }
    }

    /// Character role
    #[inline]
    #[must_use]
    pub fn role(&self) -> CharacterRole {
        self.role
    }

    /// Spatial position, locked
    #[inline]
    #[must_use]
    pub fn slot(&self) -> SpatialSlot {
        self.slot
    }

    /// Pose descriptor, locked
    #[inline]
    #[must_use]
    pub fn pose(&self) -> &str {
        &self.pose
    }

    /// Expression descriptor, locked
    #[inline]
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Emotion band, locked
    #[inline]
    #[must_use]
    pub fn emotion(&self) -> EmotionBand {
        self.emotion
    }

    /// Whether a speech bubble points here, locked
    #[inline]
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    /// Resolved character name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved demographics
    #[inline]
    #[must_use]
    pub fn demographics(&self) -> &Demographics {
        &self.demographics
    }

    /// Resolved clothing descriptor
    #[inline]
    #[must_use]
    pub fn clothing(&self) -> &str {
        &self.clothing
    }

    /// Whether the policy changed this slot's gender presentation
    #[inline]
    #[must_use]
    pub fn gender_changed(&self) -> bool {
        self.gender_changed
    }

    /// Whether the policy changed this slot's ethnicity presentation
    #[inline]
    #[must_use]
    pub fn ethnicity_changed(&self) -> bool {
        self.ethnicity_changed
    }

    /// Whether the policy changed this slot's age band
    #[inline]
    #[must_use]
    pub fn age_changed(&self) -> bool {
        self.age_changed
    }
}

/// Complete, immutable instruction set for one (panel, policy) variant
///
/// Serializable for fingerprinting and audit, deliberately without a
/// deserialization path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationSpec {
    panel: PanelId,
    policy: PolicyId,
    policy_version: u32,
    locked: LockedAttributes,
    slots: Vec<ResolvedSlot>,
}

impl TransformationSpec {
    /// Source panel identifier
    #[inline]
    #[must_use]
    pub fn panel(&self) -> &PanelId {
        &self.panel
    }

    /// Applied policy identifier
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &PolicyId {
        &self.policy
    }

    /// Applied policy version
    #[inline]
    #[must_use]
    pub fn policy_version(&self) -> u32 {
        self.policy_version
    }

    /// Locked attributes, copied verbatim from the source panel
    #[inline]
    #[must_use]
    pub fn locked(&self) -> &LockedAttributes {
        &self.locked
    }

    /// Resolved character slots, in source order
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[ResolvedSlot] {
        &self.slots
    }

    /// Slots sorted left-to-right by spatial position
    #[must_use]
    pub fn slots_in_spatial_order(&self) -> Vec<&ResolvedSlot> {
        let mut ordered: Vec<&ResolvedSlot> = self.slots.iter().collect();
        ordered.sort_by_key(|s| s.slot);
        ordered
    }

    /// Whether the policy changed any slot's gender presentation
    #[must_use]
    pub fn gender_axis_active(&self) -> bool {
        self.slots.iter().any(ResolvedSlot::gender_changed)
    }
}

/// Failure while resolving a policy against a panel
#[derive(Debug, thiserror::Error)]
pub enum PolicyResolutionError {
    /// The panel failed structural validation
    #[error(transparent)]
    InvalidMetadata(#[from] ari_panel::InvalidMetadata),

    /// The policy itself is invalid
    #[error(transparent)]
    InvalidPolicy(#[from] PolicyError),

    /// Policy overrides a role the panel does not contain
    #[error("panel {panel}: policy {policy} overrides absent role {role:?}")]
    RoleAbsent {
        /// Panel being transformed
        panel: PanelId,
        /// Policy applied
        policy: PolicyId,
        /// Role the panel lacks
        role: CharacterRole,
    },

    /// Clothing override not compatible with the target role
    #[error("panel {panel}: clothing override not compatible with role {role:?}")]
    ClothingIncompatible {
        /// Panel being transformed
        panel: PanelId,
        /// Incompatible role
        role: CharacterRole,
    },
}

/// Derives transformation specs from (panel, policy) pairs
///
/// Stateless; a unit struct keeps the derivation an explicit pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecGenerator;

impl SpecGenerator {
    /// Create a spec generator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Derive the transformation spec for one (panel, policy) pair
    ///
    /// Validates both inputs, then resolves each character slot: overridden
    /// axes take the policy value, unspecified axes pass through unchanged.
    /// Name substitutions for roles absent from the panel are ignored;
    /// demographic overrides for absent roles are an error.
    ///
    /// # Errors
    /// Returns [`PolicyResolutionError`] on malformed metadata, an invalid
    /// policy, an override targeting an absent role, or a role-incompatible
    /// clothing override
    pub fn derive(
        &self,
        panel: &ari_panel::PanelMetadata,
        policy: &VariantPolicy,
    ) -> Result<TransformationSpec, PolicyResolutionError> {
        panel.validate()?;
        policy.validate()?;

        for (role, role_override) in &policy.overrides {
            if !panel.has_role(*role) {
                return Err(PolicyResolutionError::RoleAbsent {
                    panel: panel.id.clone(),
                    policy: policy.id.clone(),
                    role: *role,
                });
            }
            if let Some(clothing) = &role_override.clothing {
                if !clothing.compatible_roles.contains(role) {
                    return Err(PolicyResolutionError::ClothingIncompatible {
                        panel: panel.id.clone(),
                        role: *role,
                    });
                }
            }
        }

        let slots = panel
            .slots
            .iter()
            .map(|slot| {
                ResolvedSlot::resolve(
                    slot,
                    policy.overrides.get(&slot.role),
                    policy.names.get(&slot.role),
                )
            })
            .collect();

        tracing::debug!(
            panel = %panel.id,
            policy = %policy.id,
            version = policy.version,
            "derived transformation spec"
        );

        Ok(TransformationSpec {
            panel: panel.id.clone(),
            policy: policy.id.clone(),
            policy_version: policy.version,
            locked: LockedAttributes::from_metadata(panel),
            slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::presets;
    use ari_panel::{
        AgeBand, EthnicityPresentation, GenderPresentation, LockedRegionKind, PanelMetadata,
    };
    use pretty_assertions::assert_eq;

    fn demographics() -> Demographics {
        Demographics {
            gender: GenderPresentation::Male,
            ethnicity: EthnicityPresentation::new("light", "European features"),
            age: AgeBand::MiddleAged,
        }
    }

    fn domestic_panel() -> PanelMetadata {
        PanelMetadata::new(
            "INS_L1_P2_03".parse().unwrap(),
            PanelCategory::DialogueDomestic,
            SceneDescription::new(
                "Leo's partner expresses concern about his exhaustion",
                "kitchen, morning",
                "bright morning light",
                "concerned",
            ),
        )
        .with_slot(
            CharacterSlot::new(
                CharacterRole::Client,
                "Leo",
                SpatialSlot::Left,
                EmotionBand::Struggling,
                demographics(),
            )
            .with_pose("slumped at kitchen table, holding coffee mug")
            .with_expression("exhausted, distant")
            .with_clothing("rumpled work shirt"),
        )
        .with_slot(
            CharacterSlot::new(
                CharacterRole::Partner,
                "Ali",
                SpatialSlot::Right,
                EmotionBand::Neutral,
                Demographics {
                    gender: GenderPresentation::Female,
                    ethnicity: EthnicityPresentation::new("light", "European features"),
                    age: AgeBand::MiddleAged,
                },
            )
            .with_pose("standing, hand on Leo's shoulder")
            .with_expression("gentle concern")
            .with_clothing("casual sweater")
            .speaking(),
        )
        .with_speech_bubble("You were up again at 3am, weren't you?")
        .with_locked_region(LockedRegion::new(
            LockedRegionKind::SpeechBubble,
            "partner's concerned question",
            "establishes impact of insomnia on relationships",
        ))
        .with_therapeutic_intent("normalize the relational impact of chronic insomnia")
    }

    #[test]
    fn locked_attributes_copied_verbatim() {
        let panel = domestic_panel();
        let spec = SpecGenerator::new()
            .derive(&panel, &presets::gender_swap_client())
            .unwrap();

        assert_eq!(spec.locked().category(), panel.category);
        assert_eq!(spec.locked().scene(), &panel.scene);
        assert_eq!(spec.locked().regions(), &panel.locked_regions[..]);
        assert_eq!(spec.locked().speech_bubbles(), &panel.speech_bubbles[..]);
        assert_eq!(spec.locked().therapeutic_intent(), panel.therapeutic_intent);

        let client = &spec.slots()[0];
        assert_eq!(client.pose(), panel.slots[0].pose);
        assert_eq!(client.expression(), panel.slots[0].expression);
        assert_eq!(client.emotion(), panel.slots[0].emotion);
        assert_eq!(client.slot(), panel.slots[0].slot);
    }

    #[test]
    fn gender_swap_resolves_name_and_axis() {
        let spec = SpecGenerator::new()
            .derive(&domestic_panel(), &presets::gender_swap_client())
            .unwrap();

        let client = &spec.slots()[0];
        assert_eq!(client.name(), "Leah");
        assert_eq!(client.demographics().gender, GenderPresentation::Female);
        assert!(client.gender_changed());
        assert!(spec.gender_axis_active());

        // Unspecified axes pass through
        assert_eq!(client.demographics().age, AgeBand::MiddleAged);
        assert_eq!(client.demographics().ethnicity.skin_tone, "light");

        // Partner untouched
        let partner = &spec.slots()[1];
        assert_eq!(partner.name(), "Ali");
        assert!(!partner.gender_changed());
    }

    #[test]
    fn ethnicity_swap_leaves_gender_axis_inactive() {
        let spec = SpecGenerator::new()
            .derive(&domestic_panel(), &presets::diverse_v2())
            .unwrap();

        let client = &spec.slots()[0];
        assert_eq!(client.demographics().ethnicity.skin_tone, "dark brown");
        assert!(client.ethnicity_changed());
        assert!(!spec.gender_axis_active());
    }

    #[test]
    fn override_for_absent_role_is_rejected() {
        let result =
            SpecGenerator::new().derive(&domestic_panel(), &presets::gender_swap_therapist());
        assert!(matches!(result, Err(PolicyResolutionError::RoleAbsent { .. })));
    }

    #[test]
    fn name_for_absent_role_is_ignored() {
        // Name table entry alone targets nothing — not an error
        let policy = presets::gender_swap_client().with_name(CharacterRole::Therapist, "Dr. Sarah");
        let spec = SpecGenerator::new().derive(&domestic_panel(), &policy).unwrap();
        assert_eq!(spec.slots()[0].name(), "Leah");
    }

    #[test]
    fn incompatible_clothing_is_rejected() {
        let policy = VariantPolicy::new("bad-clothing".parse().unwrap(), 1).with_override(
            CharacterRole::Client,
            RoleOverride::new().with_clothing(crate::policy::ClothingOverride {
                description: "lab coat".to_string(),
                compatible_roles: vec![CharacterRole::Therapist],
            }),
        );
        let result = SpecGenerator::new().derive(&domestic_panel(), &policy);
        assert!(matches!(
            result,
            Err(PolicyResolutionError::ClothingIncompatible { .. })
        ));
    }

    #[test]
    fn malformed_panel_fails_before_resolution() {
        let panel = PanelMetadata::new(
            "INS_L1_P2_01".parse().unwrap(),
            PanelCategory::DialogueTherapy,
            SceneDescription::new("s", "s", "l", "m"),
        );
        let result = SpecGenerator::new().derive(&panel, &presets::gender_swap_client());
        assert!(matches!(result, Err(PolicyResolutionError::InvalidMetadata(_))));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_gender() -> impl Strategy<Value = GenderPresentation> {
            prop_oneof![
                Just(GenderPresentation::Male),
                Just(GenderPresentation::Female),
            ]
        }

        fn arb_age() -> impl Strategy<Value = AgeBand> {
            prop_oneof![
                Just(AgeBand::YoungAdult),
                Just(AgeBand::MiddleAged),
                Just(AgeBand::Older),
                Just(AgeBand::Senior),
            ]
        }

        proptest! {
            // Whatever axes a policy overrides, locked attributes survive
            // resolution byte-for-byte.
            #[test]
            fn locked_fields_survive_any_override(
                gender in arb_gender(),
                age in arb_age(),
                name in "[A-Z][a-z]{2,8}",
            ) {
                let panel = domestic_panel();
                let policy = VariantPolicy::new("prop".parse().unwrap(), 1)
                    .with_override(
                        CharacterRole::Client,
                        RoleOverride::new().with_gender(gender).with_age(age),
                    )
                    .with_name(CharacterRole::Client, name);

                let spec = SpecGenerator::new().derive(&panel, &policy).unwrap();

                prop_assert_eq!(spec.locked().category(), panel.category);
                prop_assert_eq!(spec.locked().scene(), &panel.scene);
                prop_assert_eq!(spec.locked().speech_bubbles(), &panel.speech_bubbles[..]);
                for (resolved, source) in spec.slots().iter().zip(&panel.slots) {
                    prop_assert_eq!(resolved.pose(), source.pose.as_str());
                    prop_assert_eq!(resolved.expression(), source.expression.as_str());
                    prop_assert_eq!(resolved.emotion(), source.emotion);
                    prop_assert_eq!(resolved.slot(), source.slot);
                    prop_assert_eq!(resolved.is_speaking(), source.is_speaking);
                }
            }
        }
    }
}
