//! Pipeline configuration for mmea-fusion
//!
//! Loaded from `<config_dir>/mmea/mmea-fusion.toml` (see
//! `mmea_common::config::ConfigResolver` for the resolution order). Every
//! field has a compiled default, so an absent or partial file is valid.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [calibration]
//! adjust_every = 100
//!
//! [smoothing]
//! window = 5
//!
//! [fusion]
//! min_confidence = 0.1
//! ```

use mmea_common::config::LoggingConfig;
use mmea_common::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Module name used for the default config file path
pub const MODULE_NAME: &str = "mmea-fusion";

/// Root of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub logging: LoggingConfig,
    pub ensemble: EnsembleConfig,
    pub calibration: CalibrationConfig,
    pub smoothing: SmoothingConfig,
    pub fusion: FusionConfig,
}

impl PipelineConfig {
    /// Load and validate the config at `path` (defaults if missing)
    pub fn load(path: &Path) -> mmea_common::Result<Self> {
        let config: PipelineConfig = mmea_common::config::load_toml_config(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> mmea_common::Result<()> {
        self.logging.validate()?;
        self.ensemble.validate()?;
        self.calibration.validate()?;
        self.smoothing.validate()?;
        self.fusion.validate()?;
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> mmea_common::Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
            "{} must be in [0.0, 1.0], got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> mmea_common::Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::Config(format!("{} must be positive, got {}", name, value)));
    }
    Ok(())
}

// ============================================================================
// Ensemble
// ============================================================================

/// One preprocessing variant of the raw input and its ensemble weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantWeight {
    pub name: String,
    pub weight: f64,
}

impl VariantWeight {
    pub fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

/// `[ensemble]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Face preprocessing variants, in the order classifier outputs arrive
    pub face_variants: Vec<VariantWeight>,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            face_variants: vec![
                VariantWeight::new("standard", 0.2),
                VariantWeight::new("enhanced", 0.4),
                VariantWeight::new("adaptive", 0.2),
                VariantWeight::new("edge", 0.2),
            ],
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> mmea_common::Result<()> {
        if self.face_variants.is_empty() {
            return Err(Error::Config("ensemble.face_variants must not be empty".to_string()));
        }
        for variant in &self.face_variants {
            check_unit(&format!("ensemble weight '{}'", variant.name), variant.weight)?;
        }
        Ok(())
    }
}

// ============================================================================
// Calibration
// ============================================================================

/// `[calibration]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Observations per adjustment round (T)
    pub adjust_every: u64,
    /// Occurrence share above which a category is suppressed
    pub dominant_share: f64,
    /// Occurrence share below which a category is boosted
    pub starved_share: f64,
    pub suppress_multiplier: f64,
    pub boost_multiplier: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    /// Starting factor per label; labels not listed start at 1.0
    pub initial_factors: BTreeMap<String, f64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        let initial_factors = [
            ("angry", 0.3),
            ("disgusted", 8.0),
            ("fearful", 4.0),
            ("happy", 2.0),
            ("neutral", 1.5),
            ("sad", 0.2),
            ("surprised", 4.0),
        ]
        .into_iter()
        .map(|(label, factor)| (label.to_string(), factor))
        .collect();

        Self {
            adjust_every: 100,
            dominant_share: 0.70,
            starved_share: 0.05,
            suppress_multiplier: 0.9,
            boost_multiplier: 1.1,
            min_factor: 0.05,
            max_factor: 20.0,
            initial_factors,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> mmea_common::Result<()> {
        if self.adjust_every == 0 {
            return Err(Error::Config("calibration.adjust_every must be at least 1".to_string()));
        }
        check_unit("calibration.dominant_share", self.dominant_share)?;
        check_unit("calibration.starved_share", self.starved_share)?;
        if self.starved_share >= self.dominant_share {
            return Err(Error::Config(format!(
                "calibration.starved_share ({}) must be below dominant_share ({})",
                self.starved_share, self.dominant_share
            )));
        }
        check_positive("calibration.suppress_multiplier", self.suppress_multiplier)?;
        check_positive("calibration.boost_multiplier", self.boost_multiplier)?;
        check_positive("calibration.min_factor", self.min_factor)?;
        check_positive("calibration.max_factor", self.max_factor)?;
        if self.min_factor > self.max_factor {
            return Err(Error::Config(format!(
                "calibration.min_factor ({}) exceeds max_factor ({})",
                self.min_factor, self.max_factor
            )));
        }
        for (label, factor) in &self.initial_factors {
            check_positive(&format!("calibration.initial_factors.{}", label), *factor)?;
        }
        Ok(())
    }
}

// ============================================================================
// Smoothing
// ============================================================================

/// `[smoothing]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Window capacity (W)
    pub window: usize,
    /// Weight of the oldest vector before normalization
    pub oldest_weight: f64,
    /// Weight of the newest vector before normalization
    pub newest_weight: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: 5,
            oldest_weight: 0.5,
            newest_weight: 1.0,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> mmea_common::Result<()> {
        if self.window == 0 {
            return Err(Error::Config("smoothing.window must be at least 1".to_string()));
        }
        check_positive("smoothing.oldest_weight", self.oldest_weight)?;
        check_positive("smoothing.newest_weight", self.newest_weight)?;
        Ok(())
    }
}

// ============================================================================
// Fusion
// ============================================================================

/// `[fusion]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// A modality counts as available only above this confidence
    pub min_confidence: f64,
    pub face_weight: f64,
    pub voice_weight: f64,
    pub text_weight: f64,
    /// Per-modality neutral override: reported confidence must be below this
    pub modality_override_confidence: f64,
    /// Per-modality neutral override: a replacement must score above this
    pub modality_override_score: f64,
    /// Fused neutral override thresholds (see `fusion::overrides`)
    pub neutral_weak: f64,
    pub neutral_very_weak: f64,
    pub competitor_strong: f64,
    pub competitor_floor: f64,
    pub competitor_margin: f64,
    pub agreement_multiplier: f64,
    pub agreement_cap: f64,
    /// Modalities that must report the final category for the boost
    pub agreement_quorum: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.1,
            face_weight: 0.4,
            voice_weight: 0.3,
            text_weight: 0.3,
            modality_override_confidence: 0.6,
            modality_override_score: 0.15,
            neutral_weak: 0.6,
            neutral_very_weak: 0.5,
            competitor_strong: 0.2,
            competitor_floor: 0.15,
            competitor_margin: 0.25,
            agreement_multiplier: 1.2,
            agreement_cap: 0.95,
            agreement_quorum: 2,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> mmea_common::Result<()> {
        check_unit("fusion.min_confidence", self.min_confidence)?;
        check_unit("fusion.face_weight", self.face_weight)?;
        check_unit("fusion.voice_weight", self.voice_weight)?;
        check_unit("fusion.text_weight", self.text_weight)?;
        if self.face_weight + self.voice_weight + self.text_weight <= 0.0 {
            return Err(Error::Config("fusion base weights must not all be zero".to_string()));
        }
        check_unit("fusion.modality_override_confidence", self.modality_override_confidence)?;
        check_unit("fusion.modality_override_score", self.modality_override_score)?;
        check_unit("fusion.neutral_weak", self.neutral_weak)?;
        check_unit("fusion.neutral_very_weak", self.neutral_very_weak)?;
        check_unit("fusion.competitor_strong", self.competitor_strong)?;
        check_unit("fusion.competitor_floor", self.competitor_floor)?;
        check_unit("fusion.competitor_margin", self.competitor_margin)?;
        check_positive("fusion.agreement_multiplier", self.agreement_multiplier)?;
        check_unit("fusion.agreement_cap", self.agreement_cap)?;
        if self.agreement_quorum == 0 {
            return Err(Error::Config("fusion.agreement_quorum must be at least 1".to_string()));
        }
        Ok(())
    }
}
