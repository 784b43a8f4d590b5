//! Temporal Smoothing Filter - recency-weighted moving average
//!
//! Holds the last W combined vectors of one continuous stream (FIFO).
//! Each push returns the weighted average of the window, with weights
//! rising linearly from `oldest_weight` to `newest_weight` and normalized
//! to sum to 1. The weights are recomputed on every call.
//!
//! A window belongs to exactly one stream and is owned by its
//! `EmotionStream`; it is never shared between sessions.

use crate::config::SmoothingConfig;
use crate::error::Result;
use crate::vector::EmotionVector;
use std::collections::VecDeque;

/// Normalized linear weights for a window of `n` vectors (oldest first)
///
/// A single-element window gets weight 1.0.
pub fn recency_weights(n: usize, oldest: f64, newest: f64) -> Vec<f64> {
    let raw: Vec<f64> = match n {
        0 => return Vec::new(),
        1 => vec![oldest],
        _ => (0..n)
            .map(|i| oldest + (newest - oldest) * i as f64 / (n - 1) as f64)
            .collect(),
    };
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Bounded FIFO window over one stream's combined vectors
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    capacity: usize,
    oldest_weight: f64,
    newest_weight: f64,
    window: VecDeque<EmotionVector>,
}

impl SmoothingWindow {
    /// Create an empty window (config must already be validated)
    pub fn new(config: &SmoothingConfig) -> Self {
        let capacity = config.window.max(1);
        Self {
            capacity,
            oldest_weight: config.oldest_weight,
            newest_weight: config.newest_weight,
            window: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(&SmoothingConfig {
            window: capacity,
            ..Default::default()
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Append `vector`, evict the oldest if over capacity, return the average
    ///
    /// # Errors
    /// `ShapeMismatch` if `vector` uses a different label set than the
    /// vectors already in the window; the window is left unchanged.
    pub fn push(&mut self, vector: EmotionVector) -> Result<EmotionVector> {
        if let Some(front) = self.window.front() {
            front.ensure_same_shape(&vector)?;
        }

        self.window.push_back(vector);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        Ok(self.average())
    }

    /// Current weighted average, or `None` for an empty window
    pub fn smoothed(&self) -> Option<EmotionVector> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.average())
        }
    }

    /// Weights the current contents would be averaged with (oldest first)
    pub fn weights(&self) -> Vec<f64> {
        recency_weights(self.window.len(), self.oldest_weight, self.newest_weight)
    }

    fn average(&self) -> EmotionVector {
        let weights = self.weights();
        let newest = &self.window[self.window.len() - 1];
        let mut out = EmotionVector::zeros(newest.labels().clone());

        for (vector, weight) in self.window.iter().zip(weights) {
            for (acc, score) in out.scores_mut().iter_mut().zip(vector.scores()) {
                *acc += weight * score;
            }
        }
        out
    }
}
