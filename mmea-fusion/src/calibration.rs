//! Calibration Controller - online per-category bias correction
//!
//! Counteracts a classifier's tendency to over-predict specific categories.
//! Each recorded vector bumps the occurrence counter of its arg-max category.
//! When the observation total reaches `adjust_every`, every category's share
//! is checked once:
//! - share > `dominant_share`: factor *= `suppress_multiplier`
//! - share < `starved_share`:  factor *= `boost_multiplier`
//!
//! Factors are then clamped into `[min_factor, max_factor]` and all counters
//! reset; factors persist.
//!
//! # Concurrency
//! One controller may be shared (it is `Clone`, backed by `Arc<RwLock<_>>`)
//! by every stream that uses the same classifier. `record()` takes the write
//! lock, so updates are serialized. `snapshot()` takes the read lock only
//! long enough to clone an `Arc` of the current immutable factor table.
//!
//! # Failure policy
//! Calibration never fails. Malformed input to `record()` is ignored with a
//! logged warning, and a poisoned lock is recovered rather than propagated
//! (the state is plain numbers, always internally consistent between writes).

use crate::config::CalibrationConfig;
use crate::error::{FusionError, Result};
use crate::labels::LabelSet;
use crate::vector::EmotionVector;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Immutable view of the calibration factors at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSnapshot {
    labels: LabelSet,
    factors: Vec<f64>,
    /// Number of adjustment rounds applied before this snapshot was taken
    generation: u64,
}

impl CalibrationSnapshot {
    /// Snapshot with every factor 1.0 (calibration disabled)
    pub fn identity(labels: LabelSet) -> Self {
        let factors = vec![1.0; labels.len()];
        Self {
            labels,
            factors,
            generation: 0,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Factor for `label`, if the label is calibrated
    pub fn factor(&self, label: &str) -> Option<f64> {
        self.labels.position(label).map(|i| self.factors[i])
    }

    /// Multiply each score by its category factor (no re-normalization)
    pub fn apply(&self, vector: &mut EmotionVector) -> Result<()> {
        if vector.labels() != &self.labels {
            return Err(FusionError::shape(
                format!("calibrated labels {}", self.labels),
                vector.labels().to_string(),
            ));
        }
        for (score, factor) in vector.scores_mut().iter_mut().zip(&self.factors) {
            *score *= factor;
        }
        Ok(())
    }
}

/// Controller phase after a `record()` call
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// Observation counted; threshold not yet reached
    Accumulating { total: u64 },
    /// Threshold reached: factors adjusted and counters reset
    Adjusted { changes: Vec<FactorChange> },
    /// Input was malformed and has not been counted
    Ignored,
}

/// One factor change made during an adjustment round
#[derive(Debug, Clone, PartialEq)]
pub struct FactorChange {
    pub label: String,
    /// Occurrence share that triggered the change
    pub share: f64,
    pub old_factor: f64,
    pub new_factor: f64,
}

struct CalibrationState {
    counts: Vec<u64>,
    total: u64,
    current: Arc<CalibrationSnapshot>,
}

/// Shared handle to one classifier's calibration state
#[derive(Clone)]
pub struct CalibrationController {
    config: Arc<CalibrationConfig>,
    state: Arc<RwLock<CalibrationState>>,
}

impl CalibrationController {
    /// Create a controller over `labels`
    ///
    /// Initial factors come from `config.initial_factors`; labels without an
    /// entry start at 1.0.
    pub fn new(labels: LabelSet, config: CalibrationConfig) -> Result<Self> {
        config.validate()?;

        let factors: Vec<f64> = labels
            .iter()
            .map(|label| config.initial_factors.get(label).copied().unwrap_or(1.0))
            .map(|f| f.clamp(config.min_factor, config.max_factor))
            .collect();

        for key in config.initial_factors.keys() {
            if labels.position(key).is_none() {
                debug!("Initial factor for '{}' ignored (not in {})", key, labels);
            }
        }

        Ok(Self::from_parts(labels, factors, config))
    }

    /// Create a controller with explicit starting factors
    pub fn with_factors(labels: LabelSet, factors: Vec<f64>, config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        if factors.len() != labels.len() {
            return Err(FusionError::shape(
                format!("{} factors for {}", labels.len(), labels),
                format!("{} factors", factors.len()),
            ));
        }
        if let Some(bad) = factors.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
            return Err(FusionError::InvalidConfig(format!(
                "calibration factor must be positive, got {}",
                bad
            )));
        }
        Ok(Self::from_parts(labels, factors, config))
    }

    fn from_parts(labels: LabelSet, factors: Vec<f64>, config: CalibrationConfig) -> Self {
        let counts = vec![0; labels.len()];
        Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(CalibrationState {
                counts,
                total: 0,
                current: Arc::new(CalibrationSnapshot {
                    labels,
                    factors,
                    generation: 0,
                }),
            })),
        }
    }

    /// Current immutable factor table
    pub fn snapshot(&self) -> Arc<CalibrationSnapshot> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state.current)
    }

    pub fn labels(&self) -> LabelSet {
        self.snapshot().labels.clone()
    }

    /// Observations counted since the last adjustment round
    pub fn pending_observations(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }

    /// Occurrence counter per label since the last adjustment round
    pub fn occurrence_counts(&self) -> Vec<(String, u64)> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .current
            .labels
            .iter()
            .map(String::from)
            .zip(state.counts.iter().copied())
            .collect()
    }

    /// Count the dominant category of `vector`; adjust factors at threshold
    pub fn record(&self, vector: &EmotionVector) -> CalibrationOutcome {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if vector.labels() != &state.current.labels {
            warn!(
                "Calibration ignored vector over {} (expected {})",
                vector.labels(),
                state.current.labels
            );
            return CalibrationOutcome::Ignored;
        }

        let finite = vector.scores().iter().all(|s| s.is_finite());
        let dominant = match vector.argmax() {
            Some((index, _)) if finite && vector.sum() > 0.0 => index,
            _ => {
                warn!("Calibration ignored degenerate vector");
                return CalibrationOutcome::Ignored;
            }
        };

        state.counts[dominant] += 1;
        state.total += 1;

        if state.total < self.config.adjust_every {
            return CalibrationOutcome::Accumulating { total: state.total };
        }

        let changes = self.adjust(&mut state);
        CalibrationOutcome::Adjusted { changes }
    }

    fn adjust(&self, state: &mut CalibrationState) -> Vec<FactorChange> {
        let config = &self.config;
        let total = state.total as f64;
        let mut factors = state.current.factors.clone();
        let mut changes = Vec::new();

        for (i, label) in state.current.labels.iter().enumerate() {
            let share = state.counts[i] as f64 / total;
            let multiplier = if share > config.dominant_share {
                config.suppress_multiplier
            } else if share < config.starved_share {
                config.boost_multiplier
            } else {
                continue;
            };

            let old_factor = factors[i];
            let new_factor = (old_factor * multiplier).clamp(config.min_factor, config.max_factor);
            factors[i] = new_factor;

            if multiplier < 1.0 {
                info!(
                    "Auto-calibrating: reducing '{}' factor {:.3} -> {:.3} (share {:.1}%)",
                    label, old_factor, new_factor, share * 100.0
                );
            } else {
                info!(
                    "Auto-calibrating: increasing '{}' factor {:.3} -> {:.3} (share {:.1}%)",
                    label, old_factor, new_factor, share * 100.0
                );
            }

            changes.push(FactorChange {
                label: label.to_string(),
                share,
                old_factor,
                new_factor,
            });
        }

        state.current = Arc::new(CalibrationSnapshot {
            labels: state.current.labels.clone(),
            factors,
            generation: state.current.generation + 1,
        });
        state.counts.iter_mut().for_each(|c| *c = 0);
        state.total = 0;

        changes
    }
}
