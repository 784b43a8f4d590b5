//! Ensemble Combiner - weighted merge of parallel classifier outputs
//!
//! K preprocessing variants of the same raw input are classified
//! independently. The combiner merges their outputs:
//!
//! ```text
//! combined[c] = factor[c] * Σ weight[i] * output[i][c]
//! ```
//!
//! and re-normalizes. It is a pure function of its inputs and the
//! calibration snapshot passed in.

use crate::calibration::CalibrationSnapshot;
use crate::config::{EnsembleConfig, VariantWeight};
use crate::error::{FusionError, Result};
use crate::labels::LabelSet;
use crate::vector::{EmotionVector, Fallback, SUM_TOLERANCE};
use tracing::debug;

/// Combines K same-modality outputs with fixed weights
#[derive(Debug, Clone)]
pub struct EnsembleCombiner {
    labels: LabelSet,
    variants: Vec<VariantWeight>,
}

impl EnsembleCombiner {
    /// Create a combiner; weights must be non-negative and sum to 1
    pub fn new(labels: LabelSet, variants: Vec<VariantWeight>) -> Result<Self> {
        if variants.is_empty() {
            return Err(FusionError::InvalidWeights("no variants".to_string()));
        }
        if let Some(bad) = variants
            .iter()
            .find(|v| !(v.weight.is_finite() && v.weight >= 0.0))
        {
            return Err(FusionError::InvalidWeights(format!(
                "variant '{}' has weight {}",
                bad.name, bad.weight
            )));
        }
        let total: f64 = variants.iter().map(|v| v.weight).sum();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(FusionError::InvalidWeights(format!(
                "weights sum to {}, expected 1.0",
                total
            )));
        }
        Ok(Self { labels, variants })
    }

    /// Face combiner from the `[ensemble]` config section
    pub fn from_config(labels: LabelSet, config: &EnsembleConfig) -> Result<Self> {
        Self::new(labels, config.face_variants.clone())
    }

    /// Combiner over a single variant (weight 1.0)
    pub fn single(labels: LabelSet) -> Self {
        Self {
            labels,
            variants: vec![VariantWeight::new("default", 1.0)],
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn variants(&self) -> &[VariantWeight] {
        &self.variants
    }

    /// Merge `outputs` (one per variant, in variant order)
    ///
    /// # Errors
    /// `ShapeMismatch` if the output count differs from the variant count, or
    /// any output (or the snapshot) uses a different label set. Outputs are
    /// never realigned by label name.
    pub fn combine(
        &self,
        outputs: &[EmotionVector],
        snapshot: &CalibrationSnapshot,
    ) -> Result<EmotionVector> {
        if outputs.len() != self.variants.len() {
            return Err(FusionError::shape(
                format!("{} variant outputs", self.variants.len()),
                format!("{} outputs", outputs.len()),
            ));
        }

        let mut combined = EmotionVector::zeros(self.labels.clone());
        for (output, variant) in outputs.iter().zip(&self.variants) {
            combined.ensure_same_shape(output)?;
            for (acc, score) in combined.scores_mut().iter_mut().zip(output.scores()) {
                *acc += variant.weight * score;
            }
        }

        snapshot.apply(&mut combined)?;

        if combined.normalize(Fallback::Uniform) {
            debug!("Ensemble output degenerate after calibration; using uniform");
        }
        Ok(combined)
    }
}
