//! Classifier adapter seam
//!
//! Model inference lives outside this crate. Anything that turns a raw
//! input (a face crop, an audio chunk, a sentence) into scores over a fixed
//! label set implements `EmotionClassifier`; the rest of the pipeline only
//! ever sees `EmotionVector`s.

use crate::calibration::CalibrationSnapshot;
use crate::ensemble::EnsembleCombiner;
use crate::error::{FusionError, Result};
use crate::fusion::ModalityReading;
use crate::labels::LabelSet;
use crate::types::Modality;
use crate::vector::EmotionVector;
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

/// Single-modality emotion classifier
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Raw input type (image, audio buffer, text, ...)
    type Input: Send + Sync;

    fn modality(&self) -> Modality;

    /// Label set every output of `classify` uses, in output order
    fn labels(&self) -> LabelSet;

    /// Score one input
    ///
    /// # Returns
    /// * `Ok(EmotionVector)` over `labels()`
    /// * `Err(_)` if the model failed; the caller treats the modality as
    ///   unavailable for this round
    async fn classify(&self, input: &Self::Input) -> Result<EmotionVector>;

    /// Check if the classifier can run (model loaded, device present, ...)
    fn is_available(&self) -> bool {
        true
    }

    /// Classify and wrap the output as a fusion reading
    ///
    /// Classifier failures become an unavailable reading instead of an error.
    async fn read(&self, input: &Self::Input) -> ModalityReading {
        if !self.is_available() {
            return ModalityReading::unavailable();
        }
        match self.classify(input).await {
            Ok(scores) => ModalityReading::from_vector(scores),
            Err(e) => {
                debug!("{} classifier failed: {}", self.modality(), e);
                ModalityReading::unavailable()
            }
        }
    }
}

/// Runs one classifier over K preprocessed variants and combines the outputs
pub struct EnsembleClassifier<C: EmotionClassifier> {
    classifier: C,
    combiner: EnsembleCombiner,
}

impl<C: EmotionClassifier> EnsembleClassifier<C> {
    /// Pair a classifier with a combiner over the same label set
    pub fn new(classifier: C, combiner: EnsembleCombiner) -> Result<Self> {
        let labels = classifier.labels();
        if &labels != combiner.labels() {
            return Err(FusionError::shape(
                combiner.labels().to_string(),
                labels.to_string(),
            ));
        }
        Ok(Self {
            classifier,
            combiner,
        })
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn combiner(&self) -> &EnsembleCombiner {
        &self.combiner
    }

    /// Classify every variant (in combiner order) and combine
    ///
    /// # Errors
    /// The first classifier error, or `ShapeMismatch` from the combiner
    pub async fn classify_variants(
        &self,
        variants: &[C::Input],
        snapshot: &CalibrationSnapshot,
    ) -> Result<EmotionVector> {
        let outputs = self.classify_all(variants).await?;
        self.combiner.combine(&outputs, snapshot)
    }

    /// Raw classifier outputs for every variant, without combining
    pub async fn classify_all(&self, variants: &[C::Input]) -> Result<Vec<EmotionVector>> {
        if variants.len() != self.combiner.variants().len() {
            return Err(FusionError::shape(
                format!("{} variants", self.combiner.variants().len()),
                format!("{} inputs", variants.len()),
            ));
        }
        try_join_all(variants.iter().map(|input| self.classifier.classify(input))).await
    }
}
