//! Cross-Modal Fusion
//!
//! Merges independent per-modality readings (face, voice, text) into one
//! canonical decision:
//!
//! 1. Decide which modalities are available
//! 2. Redistribute base weights over the available ones
//! 3. Scale by confidence, after the per-modality neutral override
//! 4. Accumulate every breakdown into the canonical categories and normalize
//! 5. Arg-max, then the fused neutral override
//! 6. Agreement boost when enough modalities report the final category,
//!    unless that category is neutral
//!
//! See `engine::FusionEngine::fuse` for the step-by-step implementation.

pub mod decision;
pub mod engine;
pub mod overrides;

pub use decision::Decision;
pub use engine::FusionEngine;

use crate::labels::LabelSet;
use crate::types::{Category, Modality, Sentiment};
use crate::vector::EmotionVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_available() -> bool {
    true
}

/// One modality's classifier output, as handed to fusion
///
/// JSON shape: `{ "emotion": "happy", "confidence": 0.9, "details": {...} }`.
/// Missing fields default, so a partial reading degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityReading {
    /// Top label reported by the classifier (modality label space)
    #[serde(rename = "emotion", default)]
    pub label: String,

    /// Classifier confidence in `label` (0.0-1.0)
    #[serde(default)]
    pub confidence: f64,

    /// Per-label scores in the modality's own label space
    #[serde(rename = "details", default)]
    pub scores: EmotionVector,

    /// False if the modality failed or produced nothing this round
    #[serde(default = "default_available")]
    pub available: bool,
}

impl ModalityReading {
    pub fn new(label: &str, confidence: f64, scores: EmotionVector) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            scores,
            available: true,
        }
    }

    /// Reading whose label and confidence are the vector's arg-max
    pub fn from_vector(scores: EmotionVector) -> Self {
        let (label, confidence) = scores
            .top()
            .map(|(label, score)| (label.to_string(), score))
            .unwrap_or_default();
        Self {
            label,
            confidence,
            scores,
            available: true,
        }
    }

    /// Placeholder for a modality that produced nothing
    pub fn unavailable() -> Self {
        Self {
            label: String::new(),
            confidence: 0.0,
            scores: EmotionVector::default(),
            available: false,
        }
    }

    /// Reported label, or the breakdown's arg-max when none was reported
    pub fn effective_label(&self) -> Option<&str> {
        let label = self.label.trim();
        if label.is_empty() {
            self.scores.top().map(|(label, _)| label)
        } else {
            Some(label)
        }
    }
}

/// Readings for one fusion call, keyed the way callers send them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReadings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facial: Option<ModalityReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<ModalityReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<ModalityReading>,
}

impl SessionReadings {
    pub fn get(&self, modality: Modality) -> Option<&ModalityReading> {
        match modality {
            Modality::Face => self.facial.as_ref(),
            Modality::Voice => self.voice.as_ref(),
            Modality::Text => self.text.as_ref(),
        }
    }

    pub fn set(&mut self, modality: Modality, reading: ModalityReading) {
        let slot = match modality {
            Modality::Face => &mut self.facial,
            Modality::Voice => &mut self.voice,
            Modality::Text => &mut self.text,
        };
        *slot = Some(reading);
    }

    /// Builder form of `set`
    pub fn with(mut self, modality: Modality, reading: ModalityReading) -> Self {
        self.set(modality, reading);
        self
    }
}

/// How the final category was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPath {
    /// Plain arg-max of the fused distribution
    Argmax,
    /// Neutral arg-max replaced by the strongest competitor
    NeutralOverride,
    /// No modality was available
    NoModalities,
}

/// What one available modality put into the fused distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityContribution {
    pub modality: Modality,
    /// Base weight after redistribution over available modalities
    pub weight: f64,
    /// Confidence used for weighting (after the per-modality override)
    pub confidence: f64,
    /// `weight * confidence`
    pub effective_weight: f64,
    /// Label the modality was counted as
    pub label: String,
    /// True if a low-confidence neutral label was replaced
    pub overridden: bool,
}

/// Output of one fusion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub emotion: Category,
    pub confidence: f64,
    pub sentiment: Sentiment,
    pub decision_path: DecisionPath,
    /// Available modalities whose own label maps to `emotion` (0 when neutral)
    pub agreement: usize,
    /// True if the agreement boost was applied to `confidence`
    pub agreement_boost: bool,
    /// Normalized fused distribution over the canonical categories
    pub per_category_scores: EmotionVector,
    /// Every reading supplied for this call, available or not
    pub modality_breakdown: BTreeMap<Modality, ModalityReading>,
    pub contributions: Vec<ModalityContribution>,
    pub analyzed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FusionResult {
    /// Neutral result for a call that could not be completed
    ///
    /// Carries `error` and zero confidence so callers can tell it apart from
    /// the neutral result of a session with no usable modality.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            emotion: Category::Neutral,
            confidence: 0.0,
            sentiment: Sentiment::Neutral,
            decision_path: DecisionPath::NoModalities,
            agreement: 0,
            agreement_boost: false,
            per_category_scores: EmotionVector::neutral(LabelSet::canonical()),
            modality_breakdown: BTreeMap::new(),
            contributions: Vec::new(),
            analyzed_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
