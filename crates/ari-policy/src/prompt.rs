//! Prompt compilation
//!
//! Deterministic translation of a [`TransformationSpec`] into a
//! [`GenerationRequest`]: same spec and model in, byte-identical prompts
//! and fingerprint out. Character blocks render in spatial order so the
//! left/right composition of the source survives in the prompt text.

use crate::spec::TransformationSpec;
use ari_backend::{ConditioningMode, ConditioningParams, GenerationRequest};
use ari_panel::{Fingerprint, FingerprintError, PanelCategory};
use std::fmt::Write as _;

/// House style block prepended to every positive prompt
pub const STYLE_PROMPT: &str = "flat illustration style, soft muted color palette, clean line art, \
     calm therapeutic educational comic, simple uncluttered backgrounds, \
     consistent character design";

/// Base exclusions appended to every negative prompt
pub const NEGATIVE_PROMPT: &str = "photorealistic, 3d render, photograph, blurry, low quality, \
     distorted faces, extra limbs, violence, gore, nsfw, weapons, blood, \
     medical emergency, self-harm, disturbing imagery, scary, horror";

/// Denoise working range for character regeneration
const DENOISE_MIN: f64 = 0.30;
const DENOISE_MAX: f64 = 0.45;

/// Prompt compilation failure
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Spec could not be serialized for fingerprinting
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
}

/// Conditioning parameters appropriate for a panel category
///
/// Diagram panels get tight edge conditioning with minimal denoise;
/// dialogue panels get pose conditioning with room for demographic change.
#[must_use]
pub fn conditioning_for(category: PanelCategory) -> (ConditioningMode, f64, f64) {
    if category.has_diagram() {
        (ConditioningMode::Canny, 0.9, 0.30)
    } else if category.is_dialogue() {
        (ConditioningMode::Openpose, 0.75, 0.45)
    } else {
        (ConditioningMode::Lineart, 0.8, 0.40)
    }
}

/// Compiles transformation specs into backend generation requests
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    model_id: String,
}

impl PromptBuilder {
    /// Create a prompt builder targeting the given model
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }

    /// Target model identifier
    #[inline]
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Compile one spec into a generation request
    ///
    /// # Errors
    /// Returns [`PromptError::Fingerprint`] if the spec cannot be serialized
    pub fn build(&self, spec: &TransformationSpec) -> Result<GenerationRequest, PromptError> {
        let fingerprint =
            Fingerprint::for_generation(spec.panel(), spec.policy(), spec, &self.model_id)?;
        let (mode, strength, denoise) = conditioning_for(spec.locked().category());

        let request = GenerationRequest {
            fingerprint,
            positive_prompt: self.positive_prompt(spec),
            negative_prompt: self.negative_prompt(spec),
            conditioning: ConditioningParams {
                mode,
                reference_panel: spec.panel().clone(),
                strength,
                denoise: denoise.clamp(DENOISE_MIN, DENOISE_MAX),
            },
            model_id: self.model_id.clone(),
        };

        tracing::debug!(
            panel = %spec.panel(),
            policy = %spec.policy(),
            fingerprint = %fingerprint.short(),
            mode = mode.as_str(),
            "compiled generation request"
        );

        Ok(request)
    }

    fn positive_prompt(&self, spec: &TransformationSpec) -> String {
        let scene = spec.locked().scene();
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(STYLE_PROMPT);

        let _ = write!(
            prompt,
            "\n\nClinical therapy illustration depicting: {}\nSetting: {}\nLighting: {}\nMood: {}",
            scene.description, scene.setting, scene.lighting, scene.mood
        );

        for slot in spec.slots_in_spatial_order() {
            let demo = slot.demographics();
            let _ = write!(
                prompt,
                "\n\n{name}: {gender}, {age}, {skin} skin tone, {features}, \
                 expression showing {emotion} ({expression}), {pose}, \
                 wearing {clothing}, positioned {position}",
                name = slot.name(),
                gender = demo.gender.as_str(),
                age = demo.age.as_str(),
                skin = demo.ethnicity.skin_tone,
                features = demo.ethnicity.features,
                emotion = slot.emotion().as_str(),
                expression = slot.expression(),
                pose = slot.pose(),
                clothing = slot.clothing(),
                position = slot.slot().as_str(),
            );
            if slot.is_speaking() {
                prompt.push_str(", speaking");
            }
        }

        let regions = spec.locked().regions();
        if !regions.is_empty() {
            prompt.push_str("\n\nMust include unchanged:");
            for region in regions {
                let _ = write!(prompt, "\n- {}", region.description);
            }
        }

        prompt
    }

    fn negative_prompt(&self, spec: &TransformationSpec) -> String {
        let mut prompt = String::from(NEGATIVE_PROMPT);
        let category = spec.locked().category();

        if category.has_diagram() {
            prompt.push_str(", altered diagram content, modified text, illegible labels");
        }
        if category.is_dialogue() {
            prompt.push_str(", swapped character positions, merged characters");
        }
        if spec.gender_axis_active() {
            prompt.push_str(
                ", masculine features on female character, feminine features on male character",
            );
        }

        prompt
    }
}
