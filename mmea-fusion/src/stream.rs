//! EmotionStream - per-session pipeline for one continuous stream
//!
//! Per frame: take a calibration snapshot, combine the ensemble outputs with
//! it, push the combined vector through the session's smoothing window,
//! record the combined vector into calibration, and extract a decision from
//! the smoothed vector.
//!
//! The smoothing window is owned by the stream. The calibration controller
//! is shared with every other stream on the same classifier.

use crate::calibration::{CalibrationController, CalibrationOutcome};
use crate::config::SmoothingConfig;
use crate::ensemble::EnsembleCombiner;
use crate::error::{FusionError, Result};
use crate::fusion::decision::{self, Decision};
use crate::fusion::ModalityReading;
use crate::smoothing::SmoothingWindow;
use crate::types::Modality;
use crate::vector::EmotionVector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of one `process_frame` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameEstimate {
    /// Zero-based index of the frame within the session
    pub frame_index: u64,
    /// Calibrated ensemble output for this frame alone
    pub combined: EmotionVector,
    /// Recency-weighted average over the window
    pub smoothed: EmotionVector,
    /// Arg-max of `smoothed`
    pub decision: Decision,
    /// True if this frame triggered a calibration adjustment
    pub calibration_adjusted: bool,
}

/// One continuous stream (e.g. one video session) of a single modality
pub struct EmotionStream {
    session_id: Uuid,
    modality: Modality,
    started_at: DateTime<Utc>,
    combiner: Arc<EnsembleCombiner>,
    calibration: CalibrationController,
    window: SmoothingWindow,
    frames: u64,
}

impl EmotionStream {
    /// Start a session
    ///
    /// # Errors
    /// `ShapeMismatch` if the combiner and the calibration controller use
    /// different label sets
    pub fn new(
        modality: Modality,
        combiner: Arc<EnsembleCombiner>,
        calibration: CalibrationController,
        smoothing: &SmoothingConfig,
    ) -> Result<Self> {
        let calibrated = calibration.labels();
        if combiner.labels() != &calibrated {
            return Err(FusionError::shape(
                combiner.labels().to_string(),
                calibrated.to_string(),
            ));
        }

        let stream = Self {
            session_id: Uuid::new_v4(),
            modality,
            started_at: Utc::now(),
            combiner,
            calibration,
            window: SmoothingWindow::new(smoothing),
            frames: 0,
        };
        info!(
            "Stream {} started ({}, window {})",
            stream.session_id,
            modality,
            stream.window.capacity()
        );
        Ok(stream)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn calibration(&self) -> &CalibrationController {
        &self.calibration
    }

    /// Run one frame's ensemble outputs through the pipeline
    ///
    /// # Errors
    /// `ShapeMismatch` from the combiner. A failed frame is not counted and
    /// leaves the window and calibration untouched.
    pub fn process_frame(&mut self, outputs: &[EmotionVector]) -> Result<FrameEstimate> {
        let snapshot = self.calibration.snapshot();
        let combined = self.combiner.combine(outputs, &snapshot)?;
        let smoothed = self.window.push(combined.clone())?;

        let calibration_adjusted = matches!(
            self.calibration.record(&combined),
            CalibrationOutcome::Adjusted { .. }
        );

        let decision = decision::extract_for(self.modality, &smoothed);
        let frame_index = self.frames;
        self.frames += 1;

        debug!(
            "Stream {} frame {}: {} ({:.3}), calibration generation {}",
            self.session_id, frame_index, decision.label, decision.confidence, snapshot.generation()
        );

        Ok(FrameEstimate {
            frame_index,
            combined,
            smoothed,
            decision,
            calibration_adjusted,
        })
    }

    /// Latest smoothed estimate as a fusion reading (`None` before any frame)
    pub fn reading(&self) -> Option<ModalityReading> {
        self.window.smoothed().map(ModalityReading::from_vector)
    }

    /// Drop the smoothing history (e.g. after a scene cut); calibration is kept
    pub fn reset(&mut self) {
        debug!("Stream {} window cleared", self.session_id);
        self.window.clear();
    }
}
