//! Per-modality label sets and the lookup tables into the canonical set
//!
//! Every classifier emits scores over its own fixed, ordered label set.
//! Fusion needs them in one label space, so each modality carries an
//! explicit table from its labels to `Category`. `validate_tables()` is run
//! at startup and fails if a declared label has no mapping or is listed twice.

use crate::error::{FusionError, Result};
use crate::types::{Category, Modality};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

// ============================================================================
// Declared label sets
// ============================================================================

/// Face classifier output order
pub const FACE_LABELS: [&str; 7] = [
    "angry", "disgusted", "fearful", "happy", "neutral", "sad", "surprised",
];

/// Voice classifier raw output order (gender-split)
pub const VOICE_GENDER_LABELS: [&str; 10] = [
    "female_angry",
    "female_calm",
    "female_fearful",
    "female_happy",
    "female_sad",
    "male_angry",
    "male_calm",
    "male_fearful",
    "male_happy",
    "male_sad",
];

/// Voice labels after the gender split is collapsed
pub const VOICE_LABELS: [&str; 7] = [
    "angry", "happy", "sad", "fearful", "neutral", "disgusted", "surprised",
];

/// Text classifier output order
pub const TEXT_LABELS: [&str; 8] = [
    "anger", "disgust", "fear", "joy", "neutral", "sadness", "shame", "surprise",
];

const FACE_TABLE: &[(&str, Category)] = &[
    ("angry", Category::Anger),
    ("disgusted", Category::Disgust),
    ("fearful", Category::Fear),
    ("happy", Category::Joy),
    ("neutral", Category::Neutral),
    ("sad", Category::Sadness),
    ("surprised", Category::Surprise),
];

const VOICE_TABLE: &[(&str, Category)] = &[
    ("angry", Category::Anger),
    ("calm", Category::Neutral),
    ("neutral", Category::Neutral),
    ("fearful", Category::Fear),
    ("happy", Category::Joy),
    ("sad", Category::Sadness),
    ("disgusted", Category::Disgust),
    ("surprised", Category::Surprise),
    ("female_angry", Category::Anger),
    ("female_calm", Category::Neutral),
    ("female_fearful", Category::Fear),
    ("female_happy", Category::Joy),
    ("female_sad", Category::Sadness),
    ("male_angry", Category::Anger),
    ("male_calm", Category::Neutral),
    ("male_fearful", Category::Fear),
    ("male_happy", Category::Joy),
    ("male_sad", Category::Sadness),
];

const TEXT_TABLE: &[(&str, Category)] = &[
    ("anger", Category::Anger),
    ("disgust", Category::Disgust),
    ("fear", Category::Fear),
    ("joy", Category::Joy),
    ("neutral", Category::Neutral),
    ("sadness", Category::Sadness),
    ("shame", Category::Shame),
    ("surprise", Category::Surprise),
    ("happy", Category::Joy),
    ("sad", Category::Sadness),
    ("angry", Category::Anger),
];

fn table(modality: Modality) -> &'static [(&'static str, Category)] {
    match modality {
        Modality::Face => FACE_TABLE,
        Modality::Voice => VOICE_TABLE,
        Modality::Text => TEXT_TABLE,
    }
}

fn declared_sets(modality: Modality) -> Vec<&'static [&'static str]> {
    match modality {
        Modality::Face => vec![&FACE_LABELS[..]],
        Modality::Voice => vec![&VOICE_GENDER_LABELS[..], &VOICE_LABELS[..]],
        Modality::Text => vec![&TEXT_LABELS[..]],
    }
}

// ============================================================================
// Lookup
// ============================================================================

/// Look up a modality label in that modality's table (case-insensitive)
///
/// Canonical names are accepted for every modality, so an already-fused
/// vector resolves without a table entry.
pub fn lookup(modality: Modality, label: &str) -> Option<Category> {
    let key = label.trim().to_ascii_lowercase();
    table(modality)
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, category)| *category)
        .or_else(|| Category::from_canonical(&key))
}

/// Map a modality label into the canonical set, falling back to neutral
pub fn to_canonical(modality: Modality, label: &str) -> Category {
    match lookup(modality, label) {
        Some(category) => category,
        None => {
            warn!(
                "Unmapped {} label '{}' (treating as neutral)",
                modality, label
            );
            Category::Neutral
        }
    }
}

/// Resolve a label against every modality table, in `Modality::ALL` order
pub fn lookup_any(label: &str) -> Option<Category> {
    Modality::ALL
        .into_iter()
        .find_map(|modality| lookup(modality, label))
}

/// Verify every declared label maps into the canonical set exactly once
pub fn validate_tables() -> Result<()> {
    for modality in Modality::ALL {
        let mut seen = HashSet::new();
        for (name, _) in table(modality) {
            if !seen.insert(*name) {
                return Err(FusionError::InvalidConfig(format!(
                    "{} label '{}' listed twice in lookup table",
                    modality, name
                )));
            }
        }

        for labels in declared_sets(modality) {
            for label in labels {
                if !table(modality).iter().any(|(name, _)| name == label) {
                    return Err(FusionError::InvalidConfig(format!(
                        "{} label '{}' has no canonical mapping",
                        modality, label
                    )));
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// LabelSet
// ============================================================================

static FACE_SET: Lazy<LabelSet> = Lazy::new(|| LabelSet::new(FACE_LABELS));
static VOICE_GENDER_SET: Lazy<LabelSet> = Lazy::new(|| LabelSet::new(VOICE_GENDER_LABELS));
static VOICE_SET: Lazy<LabelSet> = Lazy::new(|| LabelSet::new(VOICE_LABELS));
static TEXT_SET: Lazy<LabelSet> = Lazy::new(|| LabelSet::new(TEXT_LABELS));
static CANONICAL_SET: Lazy<LabelSet> =
    Lazy::new(|| LabelSet::new(Category::ALL.iter().map(|c| c.as_str())));

/// Ordered, immutable category name list shared between vectors
///
/// Cloning is a reference-count bump. Two sets are equal when they hold the
/// same names in the same order.
#[derive(Clone)]
pub struct LabelSet(Arc<[String]>);

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn face() -> Self {
        FACE_SET.clone()
    }

    pub fn voice_gender() -> Self {
        VOICE_GENDER_SET.clone()
    }

    pub fn voice() -> Self {
        VOICE_SET.clone()
    }

    pub fn text() -> Self {
        TEXT_SET.clone()
    }

    /// The canonical 8-category set, in `Category::ALL` order
    pub fn canonical() -> Self {
        CANONICAL_SET.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Index of `label` (exact match)
    pub fn position(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Indices of labels that resolve to the neutral category
    pub fn neutral_indices(&self) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter(|(_, label)| lookup_any(label) == Some(Category::Neutral))
            .map(|(i, _)| i)
            .collect()
    }
}

impl PartialEq for LabelSet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for LabelSet {}

impl fmt::Debug for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
