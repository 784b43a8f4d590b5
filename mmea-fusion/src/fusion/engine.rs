//! FusionEngine - weighted cross-modal merge
//!
//! Stateless apart from its configuration; one engine can serve any number
//! of sessions concurrently.

use super::decision::{self, Decision};
use super::overrides;
use super::{
    DecisionPath, FusionResult, ModalityContribution, ModalityReading, SessionReadings,
};
use crate::config::FusionConfig;
use crate::error::Result;
use crate::labels::{self, LabelSet};
use crate::types::Modality;
use crate::vector::{EmotionVector, Fallback};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Cross-modal fusion with configured weights and thresholds
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self {
            config: FusionConfig::default(),
        }
    }
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Configured base weight of `modality` (before redistribution)
    pub fn base_weight(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Face => self.config.face_weight,
            Modality::Voice => self.config.voice_weight,
            Modality::Text => self.config.text_weight,
        }
    }

    /// Present, flagged available, and confident enough to count
    pub fn is_available(&self, reading: &ModalityReading) -> bool {
        reading.available
            && reading.confidence.is_finite()
            && reading.confidence > self.config.min_confidence
    }

    /// Fuse one set of readings into a canonical decision
    ///
    /// Never fails: missing or unusable modalities are skipped, and with none
    /// left the result is neutral via `DecisionPath::NoModalities`.
    pub fn fuse(&self, readings: &SessionReadings) -> FusionResult {
        let modality_breakdown: BTreeMap<Modality, ModalityReading> = Modality::ALL
            .into_iter()
            .filter_map(|m| readings.get(m).map(|r| (m, r.clone())))
            .collect();

        let available: Vec<(Modality, &ModalityReading)> = Modality::ALL
            .into_iter()
            .filter_map(|m| readings.get(m).map(|r| (m, r)))
            .filter(|(_, r)| self.is_available(r))
            .collect();

        if available.is_empty() {
            debug!(
                "No available modality among {} supplied; returning neutral",
                modality_breakdown.len()
            );
            let decision = Decision::neutral();
            return FusionResult {
                emotion: decision.category,
                confidence: decision.confidence,
                sentiment: decision.category.sentiment(),
                decision_path: DecisionPath::NoModalities,
                agreement: 0,
                agreement_boost: false,
                per_category_scores: EmotionVector::neutral(LabelSet::canonical()),
                modality_breakdown,
                contributions: Vec::new(),
                analyzed_at: Utc::now(),
                error: None,
            };
        }

        let base_total: f64 = available.iter().map(|(m, _)| self.base_weight(*m)).sum();
        let mut fused = EmotionVector::zeros(LabelSet::canonical());
        let mut contributions = Vec::with_capacity(available.len());

        for (modality, reading) in &available {
            let weight = if base_total > 0.0 {
                self.base_weight(*modality) / base_total
            } else {
                1.0 / available.len() as f64
            };

            let (label, confidence, overridden) =
                match overrides::modality_override(*modality, reading, &self.config) {
                    Some(replacement) => (replacement.label, replacement.score, true),
                    None => (
                        reading.effective_label().unwrap_or_default().to_string(),
                        reading.confidence,
                        false,
                    ),
                };
            let effective_weight = weight * confidence;

            accumulate(&mut fused, *modality, reading, effective_weight);

            contributions.push(ModalityContribution {
                modality: *modality,
                weight,
                confidence,
                effective_weight,
                label,
                overridden,
            });
        }

        fused.normalize(Fallback::Neutral);

        let mut decision = decision::extract(&fused);
        let mut decision_path = DecisionPath::Argmax;
        if let Some(replacement) = overrides::neutral_override(&fused, &decision, &self.config) {
            decision = replacement;
            decision_path = DecisionPath::NeutralOverride;
        }

        // Neutral decisions are never boosted
        let agreement = if decision.category.is_neutral() {
            0
        } else {
            available
                .iter()
                .filter(|(m, r)| {
                    r.effective_label()
                        .map(|label| labels::to_canonical(*m, label) == decision.category)
                        .unwrap_or(false)
                })
                .count()
        };

        let mut confidence = decision.confidence;
        let agreement_boost = agreement >= self.config.agreement_quorum;
        if agreement_boost {
            confidence = (confidence * self.config.agreement_multiplier).min(self.config.agreement_cap);
        }

        info!(
            "Fused {} modalities: {} ({:.3}, {:?}, agreement {})",
            available.len(),
            decision.category,
            confidence,
            decision_path,
            agreement
        );

        FusionResult {
            emotion: decision.category,
            confidence,
            sentiment: decision.category.sentiment(),
            decision_path,
            agreement,
            agreement_boost,
            per_category_scores: fused,
            modality_breakdown,
            contributions,
            analyzed_at: Utc::now(),
            error: None,
        }
    }
}

/// Add one modality's breakdown into the canonical accumulator
///
/// A reading with no breakdown contributes its whole weight to its label.
/// Non-finite and non-positive scores are skipped.
fn accumulate(
    fused: &mut EmotionVector,
    modality: Modality,
    reading: &ModalityReading,
    effective_weight: f64,
) {
    let slots = fused.scores_mut();

    if reading.scores.is_empty() {
        if let Some(label) = reading.effective_label() {
            slots[labels::to_canonical(modality, label).index()] += effective_weight;
        }
        return;
    }

    for (label, score) in reading.scores.iter() {
        if !score.is_finite() || score <= 0.0 {
            continue;
        }
        slots[labels::to_canonical(modality, label).index()] += score * effective_weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Sentiment};

    fn reading(label: &str, confidence: f64, pairs: &[(&str, f64)]) -> ModalityReading {
        ModalityReading::new(
            label,
            confidence,
            EmotionVector::from_pairs(pairs.iter().map(|(l, s)| (*l, *s))),
        )
    }

    #[test]
    fn test_three_agreeing_modalities_boosted_to_cap() {
        let readings = SessionReadings::default()
            .with(Modality::Face, reading("happy", 0.9, &[("happy", 0.9), ("neutral", 0.1)]))
            .with(Modality::Voice, reading("happy", 0.8, &[("happy", 0.8), ("calm", 0.2)]))
            .with(Modality::Text, reading("joy", 0.7, &[("joy", 0.7), ("neutral", 0.3)]));

        let result = FusionEngine::default().fuse(&readings);

        assert_eq!(result.emotion, Category::Joy);
        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(result.decision_path, DecisionPath::Argmax);
        assert_eq!(result.agreement, 3);
        assert!(result.agreement_boost);
        assert!((result.confidence - 0.95).abs() < 1e-12);
        // 0.663 / 0.81
        assert!((result.per_category_scores.get("joy").unwrap() - 0.663 / 0.81).abs() < 1e-9);
        assert!(result.per_category_scores.is_normalized());

        let weights: Vec<f64> = result.contributions.iter().map(|c| c.effective_weight).collect();
        assert!((weights[0] - 0.36).abs() < 1e-12);
        assert!((weights[1] - 0.24).abs() < 1e-12);
        assert!((weights[2] - 0.21).abs() < 1e-12);
    }

    #[test]
    fn test_agreeing_neutral_is_not_boosted() {
        let breakdown = [
            ("neutral", 0.8),
            ("happy", 0.1),
            ("sad", 0.1),
        ];
        let readings = SessionReadings::default()
            .with(Modality::Face, reading("neutral", 0.8, &breakdown))
            .with(Modality::Voice, reading("neutral", 0.8, &breakdown))
            .with(Modality::Text, reading("neutral", 0.8, &[("neutral", 0.8), ("joy", 0.1), ("sadness", 0.1)]));

        let result = FusionEngine::default().fuse(&readings);

        assert_eq!(result.emotion, Category::Neutral);
        assert_eq!(result.decision_path, DecisionPath::Argmax);
        assert!(!result.agreement_boost);
        assert_eq!(result.agreement, 0);
        assert!((result.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_weak_neutral_text_flips_to_sadness() {
        let readings = SessionReadings::default().with(
            Modality::Text,
            reading(
                "neutral",
                0.55,
                &[("neutral", 0.55), ("sadness", 0.35), ("joy", 0.10)],
            ),
        );

        let result = FusionEngine::default().fuse(&readings);

        assert_eq!(result.emotion, Category::Sadness);
        assert!((result.confidence - 0.35).abs() < 1e-12);
        assert_eq!(result.decision_path, DecisionPath::NeutralOverride);
        assert_eq!(result.agreement, 0);
        assert!(!result.agreement_boost);
        assert!(result.contributions[0].overridden);
        assert_eq!(result.contributions[0].label, "sadness");
    }

    #[test]
    fn test_low_confidence_face_is_excluded() {
        let readings = SessionReadings::default().with(
            Modality::Face,
            reading("angry", 0.05, &[("angry", 0.05), ("neutral", 0.95)]),
        );

        let result = FusionEngine::default().fuse(&readings);

        assert_eq!(result.emotion, Category::Neutral);
        assert_eq!(result.decision_path, DecisionPath::NoModalities);
        assert_eq!(result.per_category_scores.get("neutral"), Some(1.0));
        assert_eq!(result.modality_breakdown.len(), 1);
        assert!(result.contributions.is_empty());
    }

    #[test]
    fn test_unavailable_flag_respected() {
        let mut face = reading("happy", 0.9, &[("happy", 0.9)]);
        face.available = false;
        let readings = SessionReadings::default()
            .with(Modality::Face, face)
            .with(Modality::Text, reading("fear", 0.8, &[("fear", 0.8), ("neutral", 0.2)]));

        let result = FusionEngine::default().fuse(&readings);

        assert_eq!(result.emotion, Category::Fear);
        assert_eq!(result.contributions.len(), 1);
        assert!((result.contributions[0].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_redistributed_over_available() {
        let readings = SessionReadings::default()
            .with(Modality::Face, reading("sad", 1.0, &[("sad", 1.0)]))
            .with(Modality::Voice, reading("happy", 1.0, &[("happy", 1.0)]));

        let result = FusionEngine::default().fuse(&readings);

        // 0.4 / 0.7 vs 0.3 / 0.7
        assert!((result.contributions[0].weight - 4.0 / 7.0).abs() < 1e-12);
        assert_eq!(result.emotion, Category::Sadness);
        assert!((result.per_category_scores.get("sadness").unwrap() - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_label_only_reading_counts_one_hot() {
        let readings = SessionReadings::default().with(
            Modality::Voice,
            ModalityReading::new("angry", 0.9, EmotionVector::default()),
        );

        let result = FusionEngine::default().fuse(&readings);
        assert_eq!(result.emotion, Category::Anger);
        assert_eq!(result.per_category_scores.get("anger"), Some(1.0));
    }

    #[test]
    fn test_unmapped_labels_count_as_neutral() {
        let readings = SessionReadings::default().with(
            Modality::Text,
            reading("bored", 0.9, &[("bored", 0.9), ("joy", 0.1)]),
        );

        let result = FusionEngine::default().fuse(&readings);
        assert!((result.per_category_scores.get("neutral").unwrap() - 0.9).abs() < 1e-12);
        assert_eq!(result.emotion, Category::Neutral);
    }

    #[test]
    fn test_fuse_is_deterministic() {
        let readings = SessionReadings::default()
            .with(Modality::Face, reading("fearful", 0.6, &[("fearful", 0.6), ("surprised", 0.4)]))
            .with(Modality::Text, reading("surprise", 0.6, &[("surprise", 0.6), ("fear", 0.4)]));

        let engine = FusionEngine::default();
        let a = engine.fuse(&readings);
        let b = engine.fuse(&readings);
        assert_eq!(a.emotion, b.emotion);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.per_category_scores, b.per_category_scores);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = FusionConfig {
            agreement_quorum: 0,
            ..Default::default()
        };
        assert!(FusionEngine::new(config).is_err());
    }
}
