//! Neutral-override heuristics
//!
//! Classifiers report neutral whenever they are unsure, and a lukewarm
//! neutral would otherwise win most fused decisions. Two rules push back:
//!
//! 1. Per modality: a neutral label reported with low confidence is replaced
//!    by the strongest non-neutral label in that modality's own breakdown.
//! 2. Fused: a neutral arg-max is replaced by the strongest non-neutral
//!    category when neutral is weak or a competitor is close behind.

use super::decision::{strongest_non_neutral, Decision};
use super::ModalityReading;
use crate::config::FusionConfig;
use crate::labels;
use crate::types::{Category, Modality};
use crate::vector::EmotionVector;
use tracing::debug;

/// Replacement label chosen for a low-confidence neutral reading
#[derive(Debug, Clone, PartialEq)]
pub struct ModalityOverride {
    pub label: String,
    pub category: Category,
    /// Breakdown score of `label`; becomes the modality's confidence
    pub score: f64,
}

/// Rule 1: re-label a low-confidence neutral reading
///
/// Applies when the reading's label maps to neutral and its confidence is
/// below `modality_override_confidence`. The replacement is the
/// highest-scoring breakdown label that maps to a non-neutral category and
/// scores above `modality_override_score` (first listed wins on ties).
pub fn modality_override(
    modality: Modality,
    reading: &ModalityReading,
    config: &FusionConfig,
) -> Option<ModalityOverride> {
    let label = reading.effective_label()?;
    if !labels::to_canonical(modality, label).is_neutral()
        || reading.confidence >= config.modality_override_confidence
    {
        return None;
    }

    let mut best: Option<ModalityOverride> = None;
    for (candidate, score) in reading.scores.iter() {
        let category = match labels::lookup(modality, candidate) {
            Some(category) if !category.is_neutral() => category,
            _ => continue,
        };
        if !score.is_finite() || score <= config.modality_override_score {
            continue;
        }
        if best.as_ref().is_some_and(|b| score <= b.score) {
            continue;
        }
        best = Some(ModalityOverride {
            label: candidate.to_string(),
            category,
            score,
        });
    }

    if let Some(replacement) = &best {
        debug!(
            "{}: neutral at {:.3} replaced by {} at {:.3}",
            modality, reading.confidence, replacement.label, replacement.score
        );
    }
    best
}

/// Rule 2: replace a neutral fused decision
///
/// With `n` the neutral score and `s` the strongest non-neutral score, the
/// decision flips to that category if any of these hold:
///
/// - `n < neutral_weak` and `s > competitor_strong`
/// - `n < neutral_very_weak` and `s > competitor_floor`
/// - `s > n - competitor_margin` and `s > competitor_floor`
///
/// Returns `None` when `decision` is not neutral or no rule fires.
pub fn neutral_override(
    scores: &EmotionVector,
    decision: &Decision,
    config: &FusionConfig,
) -> Option<Decision> {
    if !decision.category.is_neutral() {
        return None;
    }

    let neutral = decision.confidence;
    let (category, score) = strongest_non_neutral(scores)?;

    let weak = neutral < config.neutral_weak && score > config.competitor_strong;
    let very_weak = neutral < config.neutral_very_weak && score > config.competitor_floor;
    let close = score > neutral - config.competitor_margin && score > config.competitor_floor;

    if weak || very_weak || close {
        debug!(
            "Fused neutral {:.3} overridden by {} at {:.3}",
            neutral, category, score
        );
        Some(Decision::canonical(category, score))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSet;

    fn canonical(scores: [f64; 8]) -> EmotionVector {
        EmotionVector::new(LabelSet::canonical(), scores.to_vec()).unwrap()
    }

    fn text_reading(label: &str, confidence: f64, pairs: &[(&str, f64)]) -> ModalityReading {
        ModalityReading::new(
            label,
            confidence,
            EmotionVector::from_pairs(pairs.iter().map(|(l, s)| (*l, *s))),
        )
    }

    #[test]
    fn test_modality_override_picks_strongest_non_neutral() {
        let reading = text_reading(
            "neutral",
            0.55,
            &[("neutral", 0.55), ("sadness", 0.35), ("joy", 0.10)],
        );
        let replacement =
            modality_override(Modality::Text, &reading, &FusionConfig::default()).unwrap();
        assert_eq!(replacement.label, "sadness");
        assert_eq!(replacement.category, Category::Sadness);
        assert_eq!(replacement.score, 0.35);
    }

    #[test]
    fn test_modality_override_needs_low_confidence() {
        let reading = text_reading("neutral", 0.7, &[("neutral", 0.7), ("sadness", 0.3)]);
        assert!(modality_override(Modality::Text, &reading, &FusionConfig::default()).is_none());
    }

    #[test]
    fn test_modality_override_needs_competitor_above_floor() {
        let reading = text_reading(
            "neutral",
            0.5,
            &[("neutral", 0.5), ("joy", 0.15), ("fear", 0.1)],
        );
        assert!(modality_override(Modality::Text, &reading, &FusionConfig::default()).is_none());
    }

    #[test]
    fn test_voice_calm_counts_as_neutral() {
        let reading = text_reading("calm", 0.4, &[("calm", 0.4), ("sad", 0.35), ("happy", 0.25)]);
        let replacement =
            modality_override(Modality::Voice, &reading, &FusionConfig::default()).unwrap();
        assert_eq!(replacement.category, Category::Sadness);
    }

    #[test]
    fn test_non_neutral_reading_untouched() {
        let reading = text_reading("joy", 0.3, &[("joy", 0.3), ("fear", 0.25)]);
        assert!(modality_override(Modality::Text, &reading, &FusionConfig::default()).is_none());
    }

    #[test]
    fn test_neutral_override_weak_neutral() {
        // anger, disgust, fear, joy, neutral, sadness, shame, surprise
        let scores = canonical([0.0, 0.0, 0.0, 0.1, 0.55, 0.35, 0.0, 0.0]);
        let decision = Decision::canonical(Category::Neutral, 0.55);
        let result = neutral_override(&scores, &decision, &FusionConfig::default()).unwrap();
        assert_eq!(result.category, Category::Sadness);
        assert_eq!(result.confidence, 0.35);
    }

    #[test]
    fn test_neutral_override_close_competitor() {
        let scores = canonical([0.0, 0.0, 0.0, 0.0, 0.62, 0.38, 0.0, 0.0]);
        let decision = Decision::canonical(Category::Neutral, 0.62);
        let result = neutral_override(&scores, &decision, &FusionConfig::default()).unwrap();
        assert_eq!(result.category, Category::Sadness);
    }

    #[test]
    fn test_neutral_override_very_weak_neutral() {
        // 0.18 is below competitor_strong and below 0.45 - 0.25
        let scores = canonical([0.1, 0.05, 0.05, 0.05, 0.45, 0.18, 0.06, 0.06]);
        let decision = Decision::canonical(Category::Neutral, 0.45);
        let result = neutral_override(&scores, &decision, &FusionConfig::default()).unwrap();
        assert_eq!(result.category, Category::Sadness);
        assert_eq!(result.confidence, 0.18);
    }

    #[test]
    fn test_very_weak_neutral_kept_without_competitor() {
        let scores = canonical([0.1, 0.1, 0.1, 0.1, 0.45, 0.12, 0.03, 0.0]);
        let decision = Decision::canonical(Category::Neutral, 0.45);
        assert!(neutral_override(&scores, &decision, &FusionConfig::default()).is_none());
    }

    #[test]
    fn test_strong_neutral_kept() {
        let scores = canonical([0.05, 0.0, 0.0, 0.1, 0.8, 0.05, 0.0, 0.0]);
        let decision = Decision::canonical(Category::Neutral, 0.8);
        assert!(neutral_override(&scores, &decision, &FusionConfig::default()).is_none());
    }

    #[test]
    fn test_non_neutral_decision_kept() {
        let scores = canonical([0.0, 0.0, 0.0, 0.6, 0.4, 0.0, 0.0, 0.0]);
        let decision = Decision::canonical(Category::Joy, 0.6);
        assert!(neutral_override(&scores, &decision, &FusionConfig::default()).is_none());
    }
}
