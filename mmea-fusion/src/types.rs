//! Core enumerations shared by every pipeline stage
//!
//! - `Category`: the canonical 8-category label space all modality outputs
//!   are mapped into before fusion
//! - `Modality`: the independent sensing channels
//! - `Sentiment`: polarity derived from a canonical category

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Canonical Category
// ============================================================================

/// Canonical emotion category
///
/// Declaration order is part of the contract: arg-max ties are broken in
/// favor of the category declared first (see `Category::ALL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Anger,
    Disgust,
    Fear,
    Joy,
    Neutral,
    Sadness,
    Shame,
    Surprise,
}

impl Category {
    /// All canonical categories in declaration (tie-break) order
    pub const ALL: [Category; 8] = [
        Category::Anger,
        Category::Disgust,
        Category::Fear,
        Category::Joy,
        Category::Neutral,
        Category::Sadness,
        Category::Shame,
        Category::Surprise,
    ];

    /// Canonical label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Anger => "anger",
            Category::Disgust => "disgust",
            Category::Fear => "fear",
            Category::Joy => "joy",
            Category::Neutral => "neutral",
            Category::Sadness => "sadness",
            Category::Shame => "shame",
            Category::Surprise => "surprise",
        }
    }

    /// Position in `Category::ALL`
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Parse a canonical label (case-insensitive)
    pub fn from_canonical(label: &str) -> Option<Category> {
        let lower = label.trim().to_ascii_lowercase();
        Category::ALL.into_iter().find(|c| c.as_str() == lower)
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Category::Neutral)
    }

    /// Polarity of this category
    pub fn sentiment(&self) -> Sentiment {
        match self {
            Category::Joy | Category::Surprise => Sentiment::Positive,
            Category::Neutral => Sentiment::Neutral,
            Category::Anger
            | Category::Disgust
            | Category::Fear
            | Category::Sadness
            | Category::Shame => Sentiment::Negative,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Modality
// ============================================================================

/// Independent sensing channel
///
/// Serialized names match the JSON keys existing callers send
/// (`facial`, `voice`, `text`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modality {
    #[serde(rename = "facial")]
    Face,
    #[serde(rename = "voice")]
    Voice,
    #[serde(rename = "text")]
    Text,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Face, Modality::Voice, Modality::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Face => "facial",
            Modality::Voice => "voice",
            Modality::Text => "text",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sentiment
// ============================================================================

/// Sentiment polarity of a canonical category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_matches_index() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_from_canonical_is_case_insensitive() {
        assert_eq!(Category::from_canonical("Joy"), Some(Category::Joy));
        assert_eq!(Category::from_canonical(" SADNESS "), Some(Category::Sadness));
        assert_eq!(Category::from_canonical("happy"), None);
    }

    #[test]
    fn test_sentiment_polarity() {
        assert_eq!(Category::Joy.sentiment(), Sentiment::Positive);
        assert_eq!(Category::Surprise.sentiment(), Sentiment::Positive);
        assert_eq!(Category::Neutral.sentiment(), Sentiment::Neutral);
        assert_eq!(Category::Shame.sentiment(), Sentiment::Negative);
    }

    #[test]
    fn test_modality_serializes_with_caller_keys() {
        assert_eq!(serde_json::to_string(&Modality::Face).unwrap(), "\"facial\"");
        assert_eq!(serde_json::to_string(&Category::Anger).unwrap(), "\"anger\"");
    }
}
