//! Panel metadata model
//!
//! Typed representation of a canonical panel's locked and adaptable
//! attributes. Produced upstream by the vision extraction step and treated
//! as read-only by the pipeline; malformed metadata fails fast with
//! [`InvalidMetadata`] before any generation attempt.

use crate::id::PanelId;
use serde::{Deserialize, Serialize};

/// Classification of panel types by transformation complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelCategory {
    /// Single narrator character addressing the viewer
    NarratorSingle,
    /// Therapist explaining alone
    TherapistSingle,
    /// Client alone
    ClientSingle,
    /// Client and therapist in conversation
    DialogueTherapy,
    /// Client with partner or family
    DialogueDomestic,
    /// Three or more characters
    MultiCharacter,
    /// Character(s) with diagram, chart, or metaphorical illustration
    ConceptualDiagram,
    /// Pure diagram or text without characters
    DiagramOnly,
}

impl PanelCategory {
    /// Whether panels of this category must contain at least one character slot
    #[inline]
    #[must_use]
    pub fn requires_characters(&self) -> bool {
        !matches!(self, Self::DiagramOnly)
    }

    /// Whether this category depicts a two-party conversation
    #[inline]
    #[must_use]
    pub fn is_dialogue(&self) -> bool {
        matches!(self, Self::DialogueTherapy | Self::DialogueDomestic)
    }

    /// Whether this category carries diagram content
    #[inline]
    #[must_use]
    pub fn has_diagram(&self) -> bool {
        matches!(self, Self::ConceptualDiagram | Self::DiagramOnly)
    }
}

/// Character role within a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterRole {
    /// The person receiving therapy
    Client,
    /// Clinical guide
    Therapist,
    /// Course guide
    Narrator,
    /// Spouse or partner
    Partner,
    /// Other characters
    Supporting,
}

impl CharacterRole {
    /// Stable lowercase label (policy files and audit params)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Therapist => "therapist",
            Self::Narrator => "narrator",
            Self::Partner => "partner",
            Self::Supporting => "supporting",
        }
    }
}

/// Closed emotion vocabulary for therapeutic accuracy
///
/// The emotional register of a panel is clinical content: a variant must
/// show the same band as its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionBand {
    /// High anxiety, frustration, despair
    Distressed,
    /// Moderate difficulty, skepticism
    Struggling,
    /// Calm, attentive
    Neutral,
    /// Engaged, optimistic
    Hopeful,
    /// Relief, success, happiness
    Positive,
}

impl EmotionBand {
    /// Stable lowercase label used in prompts
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distressed => "distressed",
            Self::Struggling => "struggling",
            Self::Neutral => "neutral",
            Self::Hopeful => "hopeful",
            Self::Positive => "positive",
        }
    }
}

/// Spatial position of a character within the frame
///
/// Ordered left-to-right; prompt rendering follows this order so that
/// left/right structural consistency survives transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialSlot {
    /// Left of frame
    Left,
    /// Center of frame
    Center,
    /// Right of frame
    Right,
}

impl SpatialSlot {
    /// Stable lowercase label used in prompts
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Gender presentation of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPresentation {
    /// Male presentation
    Male,
    /// Female presentation
    Female,
}

impl GenderPresentation {
    /// Stable lowercase label used in prompts
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Age band of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    /// Roughly 25-35
    YoungAdult,
    /// Roughly 40-55
    MiddleAged,
    /// Roughly 55-65
    Older,
    /// Roughly 65-75
    Senior,
}

impl AgeBand {
    /// Prompt-facing description
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YoungAdult => "young adult",
            Self::MiddleAged => "middle-aged",
            Self::Older => "older",
            Self::Senior => "senior",
        }
    }
}

/// Ethnicity presentation descriptors
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EthnicityPresentation {
    /// Skin tone description (e.g. "medium brown")
    pub skin_tone: String,
    /// Feature description (e.g. "South Asian features")
    pub features: String,
}

impl EthnicityPresentation {
    /// Create a new ethnicity presentation
    #[inline]
    #[must_use]
    pub fn new(skin_tone: impl Into<String>, features: impl Into<String>) -> Self {
        Self {
            skin_tone: skin_tone.into(),
            features: features.into(),
        }
    }
}

/// Demographic attributes of a character slot — all adaptable by policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    /// Gender presentation
    pub gender: GenderPresentation,
    /// Ethnicity presentation
    pub ethnicity: EthnicityPresentation,
    /// Age band
    pub age: AgeBand,
}

/// One character position within a panel
///
/// Pose, expression, emotion, and spatial slot are locked attributes;
/// demographics and clothing are adaptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSlot {
    /// Role of this character
    pub role: CharacterRole,
    /// Canonical character name (e.g. "Leo")
    pub name: String,
    /// Position in frame
    pub slot: SpatialSlot,
    /// Body position and gesture descriptor (locked)
    pub pose: String,
    /// Facial expression descriptor (locked)
    pub expression: String,
    /// Emotional band (locked)
    pub emotion: EmotionBand,
    /// Demographic attributes (adaptable)
    pub demographics: Demographics,
    /// Clothing/appearance descriptor (adaptable, role-appropriate)
    pub clothing: String,
    /// Whether a speech bubble points to this character
    pub is_speaking: bool,
}

impl CharacterSlot {
    /// Create a new character slot
    #[must_use]
    pub fn new(
        role: CharacterRole,
        name: impl Into<String>,
        slot: SpatialSlot,
        emotion: EmotionBand,
        demographics: Demographics,
    ) -> Self {
        Self {
            role,
            name: name.into(),
            slot,
            pose: String::new(),
            expression: String::new(),
            emotion,
            demographics,
            clothing: String::new(),
            is_speaking: false,
        }
    }

    /// With pose descriptor
    #[inline]
    #[must_use]
    pub fn with_pose(mut self, pose: impl Into<String>) -> Self {
        self.pose = pose.into();
        self
    }

    /// With expression descriptor
    #[inline]
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    /// With clothing descriptor
    #[inline]
    #[must_use]
    pub fn with_clothing(mut self, clothing: impl Into<String>) -> Self {
        self.clothing = clothing.into();
        self
    }

    /// Mark as the speaking character
    #[inline]
    #[must_use]
    pub fn speaking(mut self) -> Self {
        self.is_speaking = true;
        self
    }
}

/// Kind of locked therapeutic content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockedRegionKind {
    /// Thought bubble with clinical content
    ThoughtBubble,
    /// Diagram or chart
    Diagram,
    /// Worksheet or form
    Worksheet,
    /// Metaphorical illustration
    Metaphor,
    /// Speech bubble placement
    SpeechBubble,
    /// Caption or label text
    TextOverlay,
}

/// A region of the panel that must never be regenerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRegion {
    /// Kind of content
    pub kind: LockedRegionKind,
    /// What the region contains
    pub description: String,
    /// Why it is therapeutically critical
    pub purpose: String,
}

impl LockedRegion {
    /// Create a new locked region
    #[inline]
    #[must_use]
    pub fn new(
        kind: LockedRegionKind,
        description: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            purpose: purpose.into(),
        }
    }
}

/// Scene-level descriptors carried verbatim into prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Overall scene description
    pub description: String,
    /// Setting (e.g. "therapy office", "bedroom at night")
    pub setting: String,
    /// Lighting (e.g. "warm indoor", "dim nighttime")
    pub lighting: String,
    /// Mood (e.g. "tense", "hopeful", "educational")
    pub mood: String,
}

impl SceneDescription {
    /// Create a new scene description
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        setting: impl Into<String>,
        lighting: impl Into<String>,
        mood: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            setting: setting.into(),
            lighting: lighting.into(),
            mood: mood.into(),
        }
    }
}

/// Complete metadata for a single canonical panel
///
/// Immutable record produced upstream. The pipeline never mutates it; the
/// spec generator copies its locked attributes verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelMetadata {
    /// Panel identifier
    pub id: PanelId,
    /// Panel category
    pub category: PanelCategory,
    /// Scene descriptors
    pub scene: SceneDescription,
    /// Character slots, in upstream order
    pub slots: Vec<CharacterSlot>,
    /// Locked regions, in upstream order
    pub locked_regions: Vec<LockedRegion>,
    /// Speech bubble text, verbatim
    pub speech_bubbles: Vec<String>,
    /// Therapeutic-intent description (opaque, preserved verbatim)
    pub therapeutic_intent: String,
    /// Whether the panel's content demands a tighter structural threshold
    pub requires_clinical_review: bool,
}

impl PanelMetadata {
    /// Create panel metadata
    #[must_use]
    pub fn new(id: PanelId, category: PanelCategory, scene: SceneDescription) -> Self {
        Self {
            id,
            category,
            scene,
            slots: Vec::new(),
            locked_regions: Vec::new(),
            speech_bubbles: Vec::new(),
            therapeutic_intent: String::new(),
            requires_clinical_review: false,
        }
    }

    /// With a character slot
    #[inline]
    #[must_use]
    pub fn with_slot(mut self, slot: CharacterSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// With a locked region
    #[inline]
    #[must_use]
    pub fn with_locked_region(mut self, region: LockedRegion) -> Self {
        self.locked_regions.push(region);
        self
    }

    /// With a speech bubble
    #[inline]
    #[must_use]
    pub fn with_speech_bubble(mut self, text: impl Into<String>) -> Self {
        self.speech_bubbles.push(text.into());
        self
    }

    /// With therapeutic intent
    #[inline]
    #[must_use]
    pub fn with_therapeutic_intent(mut self, intent: impl Into<String>) -> Self {
        self.therapeutic_intent = intent.into();
        self
    }

    /// Flag for clinical review
    #[inline]
    #[must_use]
    pub fn with_clinical_review(mut self) -> Self {
        self.requires_clinical_review = true;
        self
    }

    /// Find the first slot with the given role
    #[inline]
    #[must_use]
    pub fn slot_for_role(&self, role: CharacterRole) -> Option<&CharacterSlot> {
        self.slots.iter().find(|s| s.role == role)
    }

    /// Whether any slot carries the given role
    #[inline]
    #[must_use]
    pub fn has_role(&self, role: CharacterRole) -> bool {
        self.slot_for_role(role).is_some()
    }

    /// Slots sorted left-to-right by spatial position
    #[must_use]
    pub fn slots_in_spatial_order(&self) -> Vec<&CharacterSlot> {
        let mut ordered: Vec<&CharacterSlot> = self.slots.iter().collect();
        ordered.sort_by_key(|s| s.slot);
        ordered
    }

    /// Validate the metadata record
    ///
    /// # Errors
    /// Returns [`InvalidMetadata`] when structural invariants are violated:
    /// - a non-`DiagramOnly` panel with no character slots
    /// - a `DiagramOnly` panel carrying character slots
    /// - a slot with an empty name or pose descriptor
    pub fn validate(&self) -> Result<(), InvalidMetadata> {
        if self.category.requires_characters() && self.slots.is_empty() {
            return Err(InvalidMetadata::MissingCharacters {
                panel: self.id.clone(),
                category: self.category,
            });
        }
        if !self.category.requires_characters() && !self.slots.is_empty() {
            return Err(InvalidMetadata::UnexpectedCharacters {
                panel: self.id.clone(),
            });
        }
        for slot in &self.slots {
            if slot.name.trim().is_empty() {
                return Err(InvalidMetadata::UnnamedSlot {
                    panel: self.id.clone(),
                    role: slot.role,
                });
            }
            if slot.pose.trim().is_empty() {
                return Err(InvalidMetadata::MissingPose {
                    panel: self.id.clone(),
                    name: slot.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Malformed upstream metadata — fatal, no generation attempted
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidMetadata {
    /// Category requires at least one character slot
    #[error("panel {panel}: category {category:?} requires at least one character slot")]
    MissingCharacters {
        /// Offending panel
        panel: PanelId,
        /// Its category
        category: PanelCategory,
    },

    /// Diagram-only panel carries character slots
    #[error("panel {panel}: diagram-only panel must not carry character slots")]
    UnexpectedCharacters {
        /// Offending panel
        panel: PanelId,
    },

    /// Slot without a character name
    #[error("panel {panel}: {role:?} slot has no character name")]
    UnnamedSlot {
        /// Offending panel
        panel: PanelId,
        /// Role of the unnamed slot
        role: CharacterRole,
    },

    /// Slot without a pose descriptor
    #[error("panel {panel}: character {name} has no pose descriptor")]
    MissingPose {
        /// Offending panel
        panel: PanelId,
        /// Character missing a pose
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demographics() -> Demographics {
        Demographics {
            gender: GenderPresentation::Male,
            ethnicity: EthnicityPresentation::new("light", "European features"),
            age: AgeBand::MiddleAged,
        }
    }

    fn client_slot() -> CharacterSlot {
        CharacterSlot::new(
            CharacterRole::Client,
            "Leo",
            SpatialSlot::Left,
            EmotionBand::Struggling,
            demographics(),
        )
        .with_pose("sitting on edge of bed, shoulders slumped")
        .with_expression("tired, frustrated")
        .with_clothing("striped pajamas")
    }

    fn panel_id(s: &str) -> PanelId {
        s.parse().unwrap()
    }

    #[test]
    fn category_requires_characters() {
        assert!(PanelCategory::ClientSingle.requires_characters());
        assert!(!PanelCategory::DiagramOnly.requires_characters());
    }

    #[test]
    fn validate_accepts_well_formed_panel() {
        let panel = PanelMetadata::new(
            panel_id("INS_L1_P3_01"),
            PanelCategory::ClientSingle,
            SceneDescription::new("Leo awake at night", "bedroom at night", "dim", "anxious"),
        )
        .with_slot(client_slot());

        assert!(panel.validate().is_ok());
    }

    #[test]
    fn validate_rejects_characterless_dialogue() {
        let panel = PanelMetadata::new(
            panel_id("INS_L1_P2_01"),
            PanelCategory::DialogueTherapy,
            SceneDescription::new("first session", "therapy office", "warm", "hopeful"),
        );

        assert!(matches!(
            panel.validate(),
            Err(InvalidMetadata::MissingCharacters { .. })
        ));
    }

    #[test]
    fn validate_rejects_diagram_only_with_characters() {
        let panel = PanelMetadata::new(
            panel_id("INS_L2_P4_02"),
            PanelCategory::DiagramOnly,
            SceneDescription::new("sleep cycle chart", "none", "flat", "educational"),
        )
        .with_slot(client_slot());

        assert!(matches!(
            panel.validate(),
            Err(InvalidMetadata::UnexpectedCharacters { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_pose() {
        let mut slot = client_slot();
        slot.pose = String::new();
        let panel = PanelMetadata::new(
            panel_id("INS_L1_P3_01"),
            PanelCategory::ClientSingle,
            SceneDescription::new("scene", "setting", "light", "mood"),
        )
        .with_slot(slot);

        assert!(matches!(panel.validate(), Err(InvalidMetadata::MissingPose { .. })));
    }

    #[test]
    fn slots_sorted_left_to_right() {
        let mut partner = client_slot();
        partner.role = CharacterRole::Partner;
        partner.name = "Ali".to_string();
        partner.slot = SpatialSlot::Right;

        let panel = PanelMetadata::new(
            panel_id("INS_L1_P2_03"),
            PanelCategory::DialogueDomestic,
            SceneDescription::new("scene", "bedroom", "warm", "concerned"),
        )
        .with_slot(partner)
        .with_slot(client_slot());

        let ordered = panel.slots_in_spatial_order();
        assert_eq!(ordered[0].name, "Leo");
        assert_eq!(ordered[1].name, "Ali");
    }

    #[test]
    fn slot_lookup_by_role() {
        let panel = PanelMetadata::new(
            panel_id("INS_L1_P3_01"),
            PanelCategory::ClientSingle,
            SceneDescription::new("scene", "setting", "light", "mood"),
        )
        .with_slot(client_slot());

        assert!(panel.has_role(CharacterRole::Client));
        assert!(!panel.has_role(CharacterRole::Therapist));
        assert_eq!(panel.slot_for_role(CharacterRole::Client).unwrap().name, "Leo");
    }

    #[test]
    fn metadata_serde_round_trip() {
        let panel = PanelMetadata::new(
            panel_id("INS_L1_P3_01"),
            PanelCategory::ClientSingle,
            SceneDescription::new("scene", "setting", "light", "mood"),
        )
        .with_slot(client_slot())
        .with_locked_region(LockedRegion::new(
            LockedRegionKind::ThoughtBubble,
            "racing anxious thoughts",
            "illustrate cognitive component of insomnia",
        ))
        .with_therapeutic_intent("psychoeducation: cognitive arousal at night");

        let json = serde_json::to_string(&panel).unwrap();
        let decoded: PanelMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(panel, decoded);
    }
}
