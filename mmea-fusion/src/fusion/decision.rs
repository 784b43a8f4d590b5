//! Decision Extractor
//!
//! Picks the highest-scoring category out of a distribution. Ties go to the
//! first label in declaration order (`EmotionVector::argmax`), so the same
//! vector always yields the same decision.

use crate::labels;
use crate::types::{Category, Modality};
use crate::vector::EmotionVector;
use serde::{Deserialize, Serialize};

/// Top category of a distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Label as it appears in the source vector
    pub label: String,
    /// Canonical category of `label`
    pub category: Category,
    /// Score of the winning label
    pub confidence: f64,
}

impl Decision {
    /// Neutral at full confidence
    pub fn neutral() -> Self {
        Self {
            label: Category::Neutral.as_str().to_string(),
            category: Category::Neutral,
            confidence: 1.0,
        }
    }

    /// Decision for a canonical category
    pub fn canonical(category: Category, confidence: f64) -> Self {
        Self {
            label: category.as_str().to_string(),
            category,
            confidence,
        }
    }
}

/// Arg-max of a canonical vector
///
/// An empty vector (or one holding only NaN) decides neutral at full
/// confidence, matching the no-signal fallback of fusion.
pub fn extract(scores: &EmotionVector) -> Decision {
    match scores.top() {
        Some((label, confidence)) => Decision {
            label: label.to_string(),
            category: labels::lookup_any(label).unwrap_or(Category::Neutral),
            confidence,
        },
        None => Decision::neutral(),
    }
}

/// Arg-max of a modality vector, mapped through that modality's table
pub fn extract_for(modality: Modality, scores: &EmotionVector) -> Decision {
    match scores.top() {
        Some((label, confidence)) => Decision {
            label: label.to_string(),
            category: labels::to_canonical(modality, label),
            confidence,
        },
        None => Decision::neutral(),
    }
}

/// Highest-scoring non-neutral category of a canonical vector
///
/// First declared wins on ties. `None` if every non-neutral score is zero
/// or the vector has no non-neutral labels.
pub fn strongest_non_neutral(scores: &EmotionVector) -> Option<(Category, f64)> {
    let mut best: Option<(Category, f64)> = None;
    for (label, score) in scores.iter() {
        let category = match Category::from_canonical(label) {
            Some(category) if !category.is_neutral() => category,
            _ => continue,
        };
        if score.is_nan() || score <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((category, score)),
        }
    }
    best
}
