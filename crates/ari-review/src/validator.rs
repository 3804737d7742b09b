//! Variant validation
//!
//! An external vision capability ([`PanelScorer`]) produces raw scores; the
//! [`Validator`] applies thresholds and aggregates a verdict. Evaluation is
//! pure so every threshold decision is unit-testable without a backend.

use ari_backend::GenerationResult;
use ari_policy::TransformationSpec;
use ari_panel::{EmotionBand, PanelCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detected emotion for one character in the generated image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEmotion {
    /// Character name as resolved in the spec
    pub name: String,
    /// Emotion band the scorer detected
    pub detected: EmotionBand,
}

/// Detection result for one locked region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCheck {
    /// Region description from the spec
    pub description: String,
    /// Whether the region is present and unaltered
    pub intact: bool,
}

/// Raw scores from the vision scorer, before thresholding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckScores {
    /// Structural similarity to the source panel, in [0, 1]
    pub structural_similarity: f64,
    /// Detected emotion per character slot
    pub slot_emotions: Vec<SlotEmotion>,
    /// Detection result per locked region
    pub regions: Vec<RegionCheck>,
    /// Style consistency with the house style, in [0, 1]
    pub style_consistency: f64,
    /// Whether the safety screen flagged the image
    pub safety_flagged: bool,
}

/// Scorer failure — infrastructure, not a content judgement
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    /// Scoring backend unavailable
    #[error("scorer unavailable: {0}")]
    Unavailable(String),

    /// Scorer produced output we could not interpret
    #[error("malformed scorer output: {0}")]
    Malformed(String),
}

/// External vision scoring capability
///
/// Implementations compare the generated artifact against the spec it was
/// generated from. The validator never inspects pixels itself.
#[async_trait::async_trait]
pub trait PanelScorer: Send + Sync {
    /// Score one generated variant against its spec
    async fn score(
        &self,
        spec: &TransformationSpec,
        result: &GenerationResult,
    ) -> Result<CheckScores, ScorerError>;
}

/// Kind of validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Composition matches the source panel
    StructuralSimilarity,
    /// Each character shows the source emotion band
    EmotionMatch,
    /// Locked therapeutic content present and unaltered
    LockedRegions,
    /// House illustration style maintained
    StyleConsistency,
    /// Content safety screen
    Safety,
}

/// Outcome status of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Check passed
    Pass,
    /// Needs human review
    Flag,
    /// Automatic rejection
    Reject,
}

/// One thresholded check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// What was checked
    pub kind: CheckKind,
    /// Raw score in [0, 1]; 1.0 or 0.0 for boolean checks
    pub score: f64,
    /// Threshold applied
    pub threshold: f64,
    /// Resulting status
    pub status: CheckStatus,
    /// Human-readable detail for flagged/rejected checks
    pub detail: Option<String>,
}

/// Aggregate validation verdict
///
/// Precedence is Reject > Flag > Pass and is computed, never assigned,
/// so no caller can override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// All checks passed
    AutoPass,
    /// At least one check flagged; human review required
    Flagged,
    /// At least one check rejected; no review possible
    AutoReject,
}

/// Complete validation report for one generated variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Individual check outcomes
    pub checks: Vec<CheckOutcome>,
    /// Aggregate verdict
    pub verdict: Verdict,
}

impl ValidationReport {
    /// Outcome for a given check kind, if present
    #[inline]
    #[must_use]
    pub fn check(&self, kind: CheckKind) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.kind == kind)
    }
}

/// Validation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Structural similarity floor
    pub structural_threshold: f64,
    /// Tighter floor for panels flagged for clinical review
    pub clinical_structural_threshold: f64,
    /// Style consistency floor (Flag only, never Reject)
    pub style_threshold: f64,
    /// Per-category structural overrides
    pub category_thresholds: BTreeMap<PanelCategory, f64>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            structural_threshold: 0.80,
            clinical_structural_threshold: 0.85,
            style_threshold: 0.70,
            category_thresholds: BTreeMap::new(),
        }
    }
}

impl ValidatorConfig {
    /// With a per-category structural override
    #[inline]
    #[must_use]
    pub fn with_category_threshold(mut self, category: PanelCategory, threshold: f64) -> Self {
        self.category_thresholds.insert(category, threshold);
        self
    }

    /// Structural threshold applicable to one spec
    ///
    /// Per-category override first, then the clinical bump, then the default.
    /// The clinical threshold applies when it is stricter than the override.
    #[must_use]
    pub fn structural_threshold_for(&self, spec: &TransformationSpec) -> f64 {
        let base = self
            .category_thresholds
            .get(&spec.locked().category())
            .copied()
            .unwrap_or(self.structural_threshold);
        if spec.locked().clinical_review() {
            base.max(self.clinical_structural_threshold)
        } else {
            base
        }
    }
}

/// Applies thresholds to raw scores and aggregates a verdict
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with the given thresholds
    #[inline]
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Evaluate raw scores against the spec
    ///
    /// Pure: same spec and scores always yield the same report.
    #[must_use]
    pub fn evaluate(&self, spec: &TransformationSpec, scores: &CheckScores) -> ValidationReport {
        let mut checks = Vec::with_capacity(5);

        let structural_threshold = self.config.structural_threshold_for(spec);
        checks.push(CheckOutcome {
            kind: CheckKind::StructuralSimilarity,
            score: scores.structural_similarity,
            threshold: structural_threshold,
            status: if scores.structural_similarity >= structural_threshold {
                CheckStatus::Pass
            } else {
                CheckStatus::Flag
            },
            detail: (scores.structural_similarity < structural_threshold).then(|| {
                format!(
                    "structural similarity {:.2} below threshold {:.2}",
                    scores.structural_similarity, structural_threshold
                )
            }),
        });

        checks.push(self.emotion_check(spec, scores));
        checks.push(Self::region_check(scores));

        checks.push(CheckOutcome {
            kind: CheckKind::StyleConsistency,
            score: scores.style_consistency,
            threshold: self.config.style_threshold,
            status: if scores.style_consistency >= self.config.style_threshold {
                CheckStatus::Pass
            } else {
                // Style drift is reviewable, never an auto-reject
                CheckStatus::Flag
            },
            detail: (scores.style_consistency < self.config.style_threshold).then(|| {
                format!(
                    "style consistency {:.2} below threshold {:.2}",
                    scores.style_consistency, self.config.style_threshold
                )
            }),
        });

        checks.push(CheckOutcome {
            kind: CheckKind::Safety,
            score: if scores.safety_flagged { 0.0 } else { 1.0 },
            threshold: 1.0,
            status: if scores.safety_flagged {
                CheckStatus::Reject
            } else {
                CheckStatus::Pass
            },
            detail: scores
                .safety_flagged
                .then(|| "content safety screen flagged the image".to_string()),
        });

        let verdict = Self::aggregate(&checks);

        tracing::info!(
            panel = %spec.panel(),
            policy = %spec.policy(),
            ?verdict,
            "validation complete"
        );

        ValidationReport { checks, verdict }
    }

    fn emotion_check(&self, spec: &TransformationSpec, scores: &CheckScores) -> CheckOutcome {
        let mut mismatches = Vec::new();
        for slot in spec.slots() {
            match scores.slot_emotions.iter().find(|e| e.name == slot.name()) {
                Some(detected) if detected.detected == slot.emotion() => {}
                Some(detected) => mismatches.push(format!(
                    "{}: expected {}, detected {}",
                    slot.name(),
                    slot.emotion().as_str(),
                    detected.detected.as_str()
                )),
                None => mismatches.push(format!("{}: no emotion detected", slot.name())),
            }
        }

        let total = spec.slots().len();
        let matched = total - mismatches.len();
        CheckOutcome {
            kind: CheckKind::EmotionMatch,
            score: if total == 0 {
                1.0
            } else {
                matched as f64 / total as f64
            },
            threshold: 1.0,
            status: if mismatches.is_empty() {
                CheckStatus::Pass
            } else {
                CheckStatus::Flag
            },
            detail: (!mismatches.is_empty()).then(|| mismatches.join("; ")),
        }
    }

    fn region_check(scores: &CheckScores) -> CheckOutcome {
        let violated: Vec<&str> = scores
            .regions
            .iter()
            .filter(|r| !r.intact)
            .map(|r| r.description.as_str())
            .collect();

        let total = scores.regions.len();
        let intact = total - violated.len();
        CheckOutcome {
            kind: CheckKind::LockedRegions,
            score: if total == 0 {
                1.0
            } else {
                intact as f64 / total as f64
            },
            threshold: 1.0,
            status: if violated.is_empty() {
                CheckStatus::Pass
            } else {
                // Altered therapeutic content is never reviewable
                CheckStatus::Reject
            },
            detail: (!violated.is_empty())
                .then(|| format!("locked content altered: {}", violated.join("; "))),
        }
    }

    fn aggregate(checks: &[CheckOutcome]) -> Verdict {
        if checks.iter().any(|c| c.status == CheckStatus::Reject) {
            Verdict::AutoReject
        } else if checks.iter().any(|c| c.status == CheckStatus::Flag) {
            Verdict::Flagged
        } else {
            Verdict::AutoPass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ari_panel::{
        AgeBand, CharacterRole, CharacterSlot, Demographics, EthnicityPresentation,
        GenderPresentation, LockedRegion, LockedRegionKind, PanelMetadata, SceneDescription,
        SpatialSlot,
    };
    use ari_policy::{presets, SpecGenerator};
    use pretty_assertions::assert_eq;

    fn demographics() -> Demographics {
        Demographics {
            gender: GenderPresentation::Male,
            ethnicity: EthnicityPresentation::new("light", "European features"),
            age: AgeBand::MiddleAged,
        }
    }

    fn spec(clinical: bool) -> TransformationSpec {
        let mut panel = PanelMetadata::new(
            "INS_L1_P3_01".parse().unwrap(),
            PanelCategory::ClientSingle,
            SceneDescription::new("Leo awake at night", "bedroom at night", "dim", "anxious"),
        )
        .with_slot(
            CharacterSlot::new(
                CharacterRole::Client,
                "Leo",
                SpatialSlot::Center,
                EmotionBand::Distressed,
                demographics(),
            )
            .with_pose("lying in bed, eyes open")
            .with_expression("wide-eyed"),
        )
        .with_locked_region(LockedRegion::new(
            LockedRegionKind::ThoughtBubble,
            "racing worries",
            "cognitive arousal",
        ));
        if clinical {
            panel = panel.with_clinical_review();
        }
        SpecGenerator::new()
            .derive(&panel, &presets::gender_swap_client())
            .unwrap()
    }

    fn passing_scores() -> CheckScores {
        CheckScores {
            structural_similarity: 0.92,
            slot_emotions: vec![SlotEmotion {
                name: "Leah".to_string(),
                detected: EmotionBand::Distressed,
            }],
            regions: vec![RegionCheck {
                description: "racing worries".to_string(),
                intact: true,
            }],
            style_consistency: 0.88,
            safety_flagged: false,
        }
    }

    #[test]
    fn all_passing_scores_auto_pass() {
        let report = Validator::default().evaluate(&spec(false), &passing_scores());
        assert_eq!(report.verdict, Verdict::AutoPass);
        assert!(report.checks.iter().all(|c| c.status == CheckStatus::Pass));
    }

    #[test]
    fn low_structural_similarity_flags() {
        let mut scores = passing_scores();
        scores.structural_similarity = 0.62;
        let report = Validator::default().evaluate(&spec(false), &scores);
        assert_eq!(report.verdict, Verdict::Flagged);
        assert_eq!(
            report.check(CheckKind::StructuralSimilarity).unwrap().status,
            CheckStatus::Flag
        );
    }

    #[test]
    fn clinical_review_tightens_threshold() {
        let mut scores = passing_scores();
        scores.structural_similarity = 0.82;

        // Passes the default 0.80 floor
        let report = Validator::default().evaluate(&spec(false), &scores);
        assert_eq!(report.verdict, Verdict::AutoPass);

        // Fails the clinical 0.85 floor
        let report = Validator::default().evaluate(&spec(true), &scores);
        assert_eq!(report.verdict, Verdict::Flagged);
    }

    #[test]
    fn category_override_applies() {
        let config = ValidatorConfig::default()
            .with_category_threshold(PanelCategory::ClientSingle, 0.95);
        let report = Validator::new(config).evaluate(&spec(false), &passing_scores());
        assert_eq!(report.verdict, Verdict::Flagged);
    }

    #[test]
    fn emotion_mismatch_flags() {
        let mut scores = passing_scores();
        scores.slot_emotions[0].detected = EmotionBand::Positive;
        let report = Validator::default().evaluate(&spec(false), &scores);
        assert_eq!(report.verdict, Verdict::Flagged);
        let check = report.check(CheckKind::EmotionMatch).unwrap();
        assert!(check.detail.as_ref().unwrap().contains("expected distressed"));
    }

    #[test]
    fn locked_region_violation_rejects_regardless_of_scores() {
        let mut scores = passing_scores();
        scores.regions[0].intact = false;
        let report = Validator::default().evaluate(&spec(false), &scores);
        assert_eq!(report.verdict, Verdict::AutoReject);
        assert_eq!(
            report.check(CheckKind::LockedRegions).unwrap().status,
            CheckStatus::Reject
        );
    }

    #[test]
    fn safety_flag_rejects() {
        let mut scores = passing_scores();
        scores.safety_flagged = true;
        let report = Validator::default().evaluate(&spec(false), &scores);
        assert_eq!(report.verdict, Verdict::AutoReject);
    }

    #[test]
    fn style_drift_flags_but_never_rejects() {
        let mut scores = passing_scores();
        scores.style_consistency = 0.40;
        let report = Validator::default().evaluate(&spec(false), &scores);
        assert_eq!(report.verdict, Verdict::Flagged);
        assert_eq!(
            report.check(CheckKind::StyleConsistency).unwrap().status,
            CheckStatus::Flag
        );
    }

    #[test]
    fn reject_takes_precedence_over_flag() {
        let mut scores = passing_scores();
        scores.structural_similarity = 0.50;
        scores.regions[0].intact = false;
        let report = Validator::default().evaluate(&spec(false), &scores);
        assert_eq!(report.verdict, Verdict::AutoReject);
    }

    #[test]
    fn evaluate_is_pure() {
        let validator = Validator::default();
        let spec = spec(false);
        let scores = passing_scores();
        assert_eq!(
            validator.evaluate(&spec, &scores),
            validator.evaluate(&spec, &scores)
        );
    }
}
