//! Testing utilities for the ARI workspace
//!
//! Shared fixtures: a small catalogue of sample panels mirroring the
//! insomnia course, a stub generation backend, and a scriptable scorer.

#![allow(missing_docs)]

use ari_backend::{
    ArtifactRef, BackendError, EchoedParams, GenerationBackend, GenerationRequest,
    GenerationResult,
};
use ari_panel::{
    AgeBand, CharacterRole, CharacterSlot, Demographics, EmotionBand, EthnicityPresentation,
    GenderPresentation, LockedRegion, LockedRegionKind, PanelCategory, PanelMetadata,
    SceneDescription, SpatialSlot,
};
use ari_policy::TransformationSpec;
use ari_review::{CheckScores, PanelScorer, RegionCheck, ScorerError, SlotEmotion};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub fn default_demographics() -> Demographics {
    Demographics {
        gender: GenderPresentation::Male,
        ethnicity: EthnicityPresentation::new("light", "European features"),
        age: AgeBand::MiddleAged,
    }
}

fn female_demographics() -> Demographics {
    Demographics {
        gender: GenderPresentation::Female,
        ..default_demographics()
    }
}

/// Narrator welcoming the user to the course
pub fn narrator_panel() -> PanelMetadata {
    PanelMetadata::new(
        "INS_L1_P1_01".parse().unwrap(),
        PanelCategory::NarratorSingle,
        SceneDescription::new(
            "Rebecca welcomes the user to the sleep course",
            "abstract warm background",
            "soft warm",
            "welcoming",
        ),
    )
    .with_slot(
        CharacterSlot::new(
            CharacterRole::Narrator,
            "Rebecca",
            SpatialSlot::Center,
            EmotionBand::Hopeful,
            female_demographics(),
        )
        .with_pose("standing, open welcoming gesture")
        .with_expression("warm smile")
        .with_clothing("teal blouse")
        .speaking(),
    )
    .with_speech_bubble("Welcome! Over the next weeks we'll rebuild your sleep together.")
    .with_therapeutic_intent("establish rapport and course framing")
}

/// Client alone, awake at night
pub fn client_night_panel() -> PanelMetadata {
    PanelMetadata::new(
        "INS_L1_P3_01".parse().unwrap(),
        PanelCategory::ClientSingle,
        SceneDescription::new(
            "Leo lying awake staring at the ceiling",
            "bedroom at night",
            "dim blue nighttime",
            "anxious",
        ),
    )
    .with_slot(
        CharacterSlot::new(
            CharacterRole::Client,
            "Leo",
            SpatialSlot::Center,
            EmotionBand::Distressed,
            default_demographics(),
        )
        .with_pose("lying in bed, eyes open, hands on chest")
        .with_expression("wide-eyed, tense")
        .with_clothing("striped pajamas"),
    )
    .with_locked_region(LockedRegion::new(
        LockedRegionKind::ThoughtBubble,
        "thought bubble: racing worries about tomorrow's meeting",
        "illustrates cognitive arousal at night",
    ))
    .with_therapeutic_intent("psychoeducation: the anxious mind keeps the body awake")
}

/// First therapy session: Leo and Ian in conversation
pub fn therapy_panel() -> PanelMetadata {
    PanelMetadata::new(
        "INS_L1_P4_02".parse().unwrap(),
        PanelCategory::DialogueTherapy,
        SceneDescription::new(
            "Ian explains sleep restriction to a skeptical Leo",
            "therapy office, two armchairs",
            "warm indoor",
            "attentive",
        ),
    )
    .with_slot(
        CharacterSlot::new(
            CharacterRole::Client,
            "Leo",
            SpatialSlot::Left,
            EmotionBand::Struggling,
            default_demographics(),
        )
        .with_pose("seated, arms crossed")
        .with_expression("skeptical frown")
        .with_clothing("grey sweater"),
    )
    .with_slot(
        CharacterSlot::new(
            CharacterRole::Therapist,
            "Ian",
            SpatialSlot::Right,
            EmotionBand::Neutral,
            Demographics {
                age: AgeBand::Older,
                ..default_demographics()
            },
        )
        .with_pose("seated, leaning forward, hands open")
        .with_expression("calm, attentive")
        .with_clothing("navy cardigan")
        .speaking(),
    )
    .with_speech_bubble("Less time in bed can actually mean more sleep. Let me show you why.")
    .with_locked_region(LockedRegion::new(
        LockedRegionKind::SpeechBubble,
        "therapist's explanation of sleep restriction",
        "core clinical instruction, wording approved",
    ))
    .with_therapeutic_intent("introduce sleep restriction therapy")
    .with_clinical_review()
}

/// Leo's partner expresses concern at the kitchen table
pub fn domestic_panel() -> PanelMetadata {
    PanelMetadata::new(
        "INS_L1_P2_03".parse().unwrap(),
        PanelCategory::DialogueDomestic,
        SceneDescription::new(
            "Leo's partner notices his exhaustion over breakfast",
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
            default_demographics(),
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
            female_demographics(),
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
        "establishes relational impact of insomnia",
    ))
    .with_therapeutic_intent("normalize the relational impact of chronic insomnia")
}

/// Leo examining the sleep pressure chart
pub fn diagram_panel() -> PanelMetadata {
    PanelMetadata::new(
        "INS_L2_P1_04".parse().unwrap(),
        PanelCategory::ConceptualDiagram,
        SceneDescription::new(
            "Leo examining a chart of sleep pressure across the day",
            "abstract conceptual space",
            "flat neutral",
            "educational",
        ),
    )
    .with_slot(
        CharacterSlot::new(
            CharacterRole::Client,
            "Leo",
            SpatialSlot::Left,
            EmotionBand::Neutral,
            default_demographics(),
        )
        .with_pose("standing, pointing at the chart")
        .with_expression("curious")
        .with_clothing("casual shirt"),
    )
    .with_locked_region(LockedRegion::new(
        LockedRegionKind::Diagram,
        "sleep pressure curve rising across the day, dipping after naps",
        "core psychoeducation content, clinically reviewed",
    ))
    .with_therapeutic_intent("explain homeostatic sleep pressure")
    .with_clinical_review()
}

/// Pure diagram panel with no characters
pub fn diagram_only_panel() -> PanelMetadata {
    PanelMetadata::new(
        "INS_L2_P4_02".parse().unwrap(),
        PanelCategory::DiagramOnly,
        SceneDescription::new(
            "the sleep cycle stages across one night",
            "none",
            "flat",
            "educational",
        ),
    )
    .with_locked_region(LockedRegion::new(
        LockedRegionKind::Diagram,
        "hypnogram: REM and deep sleep stages across one night",
        "core psychoeducation content",
    ))
    .with_therapeutic_intent("explain sleep architecture")
}

/// The full sample catalogue
pub fn sample_catalogue() -> Vec<PanelMetadata> {
    vec![
        narrator_panel(),
        client_night_panel(),
        therapy_panel(),
        domestic_panel(),
        diagram_panel(),
        diagram_only_panel(),
    ]
}

/// Scriptable generation backend
///
/// Succeeds by default; optionally pops scripted failures first and can
/// delay each call to exercise timeouts and coalescing.
pub struct StubBackend {
    failures: Mutex<VecDeque<BackendError>>,
    calls: AtomicU64,
    delay: Option<Duration>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
            delay: None,
        }
    }

    pub fn with_failures(failures: Vec<BackendError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            calls: AtomicU64::new(0),
            delay: None,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
            delay: Some(delay),
        }
    }

    /// Backend calls made so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GenerationBackend for StubBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.failures.lock().pop_front() {
            return Err(failure);
        }
        Ok(GenerationResult {
            fingerprint: request.fingerprint,
            artifact: ArtifactRef::new(format!(
                "stub://{}/{call}",
                request.fingerprint.short()
            )),
            params: EchoedParams {
                strength: request.conditioning.strength,
                denoise: request.conditioning.denoise,
                model_id: request.model_id.clone(),
            },
            generated_at: chrono::Utc::now(),
        })
    }

    fn model_id(&self) -> &str {
        "stub-model"
    }
}

/// Scores that pass every check for the given spec
pub fn passing_scores(spec: &TransformationSpec) -> CheckScores {
    CheckScores {
        structural_similarity: 0.92,
        slot_emotions: spec
            .slots()
            .iter()
            .map(|slot| SlotEmotion {
                name: slot.name().to_string(),
                detected: slot.emotion(),
            })
            .collect(),
        regions: spec
            .locked()
            .regions()
            .iter()
            .map(|region| RegionCheck {
                description: region.description.clone(),
                intact: true,
            })
            .collect(),
        style_consistency: 0.88,
        safety_flagged: false,
    }
}

/// Passing scores with a degraded structural similarity
pub fn flagged_scores(spec: &TransformationSpec, structural: f64) -> CheckScores {
    CheckScores {
        structural_similarity: structural,
        ..passing_scores(spec)
    }
}

/// Scores with the first locked region reported altered
pub fn rejecting_scores(spec: &TransformationSpec) -> CheckScores {
    let mut scores = passing_scores(spec);
    if let Some(first) = scores.regions.first_mut() {
        first.intact = false;
    }
    scores
}

/// Scriptable scorer
///
/// Pops scripted scores in order; once exhausted, derives passing scores
/// from the spec.
pub struct ScriptedScorer {
    scripted: Mutex<VecDeque<CheckScores>>,
}

impl ScriptedScorer {
    /// Always report passing scores
    pub fn passing() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
        }
    }

    /// Pop the given scores in order, then report passing scores
    pub fn with_scores(scores: Vec<CheckScores>) -> Self {
        Self {
            scripted: Mutex::new(scores.into()),
        }
    }
}

/// Scorer that panics on every call
///
/// Exercises the worker pool's handling of tasks that die without an
/// outcome.
pub struct PanickingScorer;

#[async_trait::async_trait]
impl PanelScorer for PanickingScorer {
    async fn score(
        &self,
        _spec: &TransformationSpec,
        _result: &GenerationResult,
    ) -> Result<CheckScores, ScorerError> {
        panic!("scorer wired to die");
    }
}

#[async_trait::async_trait]
impl PanelScorer for ScriptedScorer {
    async fn score(
        &self,
        spec: &TransformationSpec,
        _result: &GenerationResult,
    ) -> Result<CheckScores, ScorerError> {
        if let Some(scores) = self.scripted.lock().pop_front() {
            return Ok(scores);
        }
        Ok(passing_scores(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalogue_validates() {
        for panel in sample_catalogue() {
            assert!(panel.validate().is_ok(), "panel {} invalid", panel.id);
        }
    }
}
