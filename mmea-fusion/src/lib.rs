//! mmea-fusion library interface
//!
//! Multi-modal emotion estimation pipeline: ensemble combination,
//! online calibration, temporal smoothing and cross-modal fusion.

pub mod calibration;
pub mod classifier;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod fusion;
pub mod labels;
pub mod smoothing;
pub mod stream;
pub mod types;
pub mod vector;
pub mod voice;

pub use crate::error::{FusionError, Result};
pub use crate::fusion::{FusionEngine, FusionResult, ModalityReading, SessionReadings};
pub use crate::types::{Category, Modality, Sentiment};
pub use crate::vector::EmotionVector;

use crate::calibration::CalibrationController;
use crate::config::PipelineConfig;
use crate::ensemble::EnsembleCombiner;
use crate::labels::LabelSet;
use crate::stream::EmotionStream;
use std::sync::Arc;
use tracing::info;

/// Process-wide pipeline state shared by every session
///
/// Holds the fusion engine and the face classifier's combiner and
/// calibration controller. Streams created here share that one controller.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    engine: FusionEngine,
    face_combiner: Arc<EnsembleCombiner>,
    face_calibration: CalibrationController,
}

impl Pipeline {
    /// Validate label tables and config, then build the shared components
    pub fn new(config: PipelineConfig) -> Result<Self> {
        labels::validate_tables()?;
        config.validate()?;

        let engine = FusionEngine::new(config.fusion.clone())?;
        let face_combiner = Arc::new(EnsembleCombiner::from_config(
            LabelSet::face(),
            &config.ensemble,
        )?);
        let face_calibration =
            CalibrationController::new(LabelSet::face(), config.calibration.clone())?;

        info!(
            "Pipeline ready: {} face variants, calibration every {} frames, smoothing window {}",
            face_combiner.variants().len(),
            config.calibration.adjust_every,
            config.smoothing.window
        );

        Ok(Self {
            config: Arc::new(config),
            engine,
            face_combiner,
            face_calibration,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &FusionEngine {
        &self.engine
    }

    pub fn face_calibration(&self) -> &CalibrationController {
        &self.face_calibration
    }

    /// Start a face stream sharing this pipeline's calibration
    pub fn face_stream(&self) -> Result<EmotionStream> {
        EmotionStream::new(
            Modality::Face,
            Arc::clone(&self.face_combiner),
            self.face_calibration.clone(),
            &self.config.smoothing,
        )
    }

    /// Fuse one set of readings
    pub fn fuse(&self, readings: &SessionReadings) -> FusionResult {
        self.engine.fuse(readings)
    }
}
