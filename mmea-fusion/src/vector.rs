//! EmotionVector - fixed-size categorical probability distribution
//!
//! Invariant: after `normalize()`, scores are non-negative and sum to 1.0
//! within `SUM_TOLERANCE`. A vector whose raw total is zero (or that holds
//! NaN/infinite scores only) is degenerate and collapses to a fallback
//! distribution chosen by the call site.
//!
//! Serializes as a JSON object `{ label: score, ... }` in label order.
//! Deserialization keeps the order the labels appear in the document and
//! skips entries whose value is not a number (callers nest metadata such as
//! `"gender"` next to the scores). A map with no top-level scores takes them
//! from a nested score map instead, see `NESTED_SCORE_KEYS`.

use crate::error::{FusionError, Result};
use crate::labels::LabelSet;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::{debug, warn};

/// Maximum deviation of a normalized vector's total from 1.0
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Nested score maps accepted in place of top-level scores, in preference
/// order (the voice classifier reports `{ "gender": ..., "all_scores_10": {...} }`)
pub const NESTED_SCORE_KEYS: [&str; 3] = ["all_scores", "all_scores_10", "all_scores_7"];

/// Distribution used when a vector cannot be normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Equal weight on every category
    Uniform,
    /// All weight on the neutral categories (uniform if the set has none)
    Neutral,
}

/// Ordered mapping from a label set to non-negative scores
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionVector {
    labels: LabelSet,
    scores: Vec<f64>,
}

impl EmotionVector {
    /// Build a vector; `scores` must have one entry per label
    pub fn new(labels: LabelSet, scores: Vec<f64>) -> Result<Self> {
        if labels.len() != scores.len() {
            return Err(FusionError::shape(
                format!("{} scores for {}", labels.len(), labels),
                format!("{} scores", scores.len()),
            ));
        }
        Ok(Self { labels, scores })
    }

    /// Build from `(label, score)` pairs, keeping their order
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (labels, scores): (Vec<String>, Vec<f64>) = pairs
            .into_iter()
            .map(|(label, score)| (label.into(), score))
            .unzip();
        Self {
            labels: LabelSet::new(labels),
            scores,
        }
    }

    /// All-zero vector over `labels` (an accumulator, not yet normalized)
    pub fn zeros(labels: LabelSet) -> Self {
        let scores = vec![0.0; labels.len()];
        Self { labels, scores }
    }

    pub fn uniform(labels: LabelSet) -> Self {
        let n = labels.len();
        let scores = if n == 0 {
            Vec::new()
        } else {
            vec![1.0 / n as f64; n]
        };
        Self { labels, scores }
    }

    /// All weight on the neutral label(s); uniform if `labels` has none
    pub fn neutral(labels: LabelSet) -> Self {
        let neutral = labels.neutral_indices();
        if neutral.is_empty() {
            return Self::uniform(labels);
        }
        let share = 1.0 / neutral.len() as f64;
        let mut scores = vec![0.0; labels.len()];
        for i in neutral {
            scores[i] = share;
        }
        Self { labels, scores }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub(crate) fn scores_mut(&mut self) -> &mut [f64] {
        &mut self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score of `label`, if the label is part of this vector
    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels.position(label).map(|i| self.scores[i])
    }

    /// `(label, score)` pairs in label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().zip(self.scores.iter().copied())
    }

    pub fn sum(&self) -> f64 {
        self.scores.iter().sum()
    }

    /// True if every score is finite and non-negative and the total is 1.0
    pub fn is_normalized(&self) -> bool {
        self.scores.iter().all(|s| s.is_finite() && *s >= 0.0)
            && (self.sum() - 1.0).abs() <= SUM_TOLERANCE
    }

    /// Fail with `ShapeMismatch` unless both vectors share a label set
    pub fn ensure_same_shape(&self, other: &EmotionVector) -> Result<()> {
        if self.labels != other.labels {
            return Err(FusionError::shape(
                self.labels.to_string(),
                other.labels.to_string(),
            ));
        }
        Ok(())
    }

    /// Re-key this vector onto `labels` by name
    ///
    /// Labels of `labels` missing here get 0.0. Pipeline stages never call
    /// this; it is for front ends building vectors from named maps.
    ///
    /// # Errors
    /// `ShapeMismatch` if this vector has a label not in `labels`
    pub fn aligned_to(&self, labels: &LabelSet) -> Result<EmotionVector> {
        if &self.labels == labels {
            return Ok(self.clone());
        }
        if let Some(unknown) = self.labels.iter().find(|l| labels.position(l).is_none()) {
            return Err(FusionError::shape(
                labels.to_string(),
                format!("unknown label '{}'", unknown),
            ));
        }
        let scores = labels
            .iter()
            .map(|label| self.get(label).unwrap_or(0.0))
            .collect();
        Ok(Self {
            labels: labels.clone(),
            scores,
        })
    }

    /// Rescale scores to sum to 1
    ///
    /// NaN, infinite and negative scores are zeroed first. If nothing
    /// positive remains, the vector is replaced by `fallback`.
    ///
    /// # Returns
    /// `true` if the fallback was applied (the vector was degenerate)
    pub fn normalize(&mut self, fallback: Fallback) -> bool {
        if self.scores.is_empty() {
            return false;
        }

        let mut sanitized = 0usize;
        for score in self.scores.iter_mut() {
            if !score.is_finite() || *score < 0.0 {
                *score = 0.0;
                sanitized += 1;
            }
        }
        if sanitized > 0 {
            warn!("Zeroed {} non-finite or negative scores", sanitized);
        }

        let total = self.sum();
        if total > 0.0 && total.is_finite() {
            for score in self.scores.iter_mut() {
                *score /= total;
            }
            return false;
        }

        warn!(
            "Degenerate vector over {} (total {}), using {:?} fallback",
            self.labels, total, fallback
        );
        let labels = self.labels.clone();
        *self = match fallback {
            Fallback::Uniform => Self::uniform(labels),
            Fallback::Neutral => Self::neutral(labels),
        };
        true
    }

    /// Consuming form of `normalize`
    pub fn normalized(mut self, fallback: Fallback) -> Self {
        self.normalize(fallback);
        self
    }

    /// Index and score of the highest-scoring category
    ///
    /// Ties go to the lowest index (first declared label wins). NaN scores
    /// never win. Returns `None` for an empty vector.
    pub fn argmax(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &score) in self.scores.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((i, score)),
            }
        }
        best
    }

    /// Label and score of the highest-scoring category (see `argmax`)
    pub fn top(&self) -> Option<(&str, f64)> {
        self.argmax()
            .and_then(|(i, score)| self.labels.get(i).map(|label| (label, score)))
    }
}

impl Default for EmotionVector {
    /// Empty vector (no labels)
    fn default() -> Self {
        Self {
            labels: LabelSet::new(Vec::<String>::new()),
            scores: Vec::new(),
        }
    }
}

impl Serialize for EmotionVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (label, score) in self.iter() {
            map.serialize_entry(label, &score)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreEntry {
    Score(f64),
    Nested(EmotionVector),
    Other(IgnoredAny),
}

struct EmotionVectorVisitor;

impl<'de> Visitor<'de> for EmotionVectorVisitor {
    type Value = EmotionVector;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of category label to score")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut pairs: Vec<(String, f64)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        let mut nested: Vec<(String, EmotionVector)> = Vec::new();
        while let Some((label, entry)) = access.next_entry::<String, ScoreEntry>()? {
            match entry {
                ScoreEntry::Score(score) => pairs.push((label, score)),
                ScoreEntry::Nested(vector) if NESTED_SCORE_KEYS.contains(&label.as_str()) => {
                    nested.push((label, vector))
                }
                ScoreEntry::Nested(_) | ScoreEntry::Other(_) => {
                    debug!("Skipping non-numeric entry '{}'", label)
                }
            }
        }

        if pairs.is_empty() {
            let preferred = NESTED_SCORE_KEYS
                .iter()
                .find_map(|key| nested.iter().position(|(label, _)| label == key));
            if let Some(index) = preferred {
                let (key, vector) = nested.swap_remove(index);
                debug!("Using nested scores from '{}'", key);
                return Ok(vector);
            }
        }
        Ok(EmotionVector::from_pairs(pairs))
    }
}

impl<'de> Deserialize<'de> for EmotionVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(EmotionVectorVisitor)
    }
}
