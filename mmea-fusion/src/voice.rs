//! Voice gender collapse
//!
//! The voice classifier scores ten gender-split labels. Downstream stages
//! use the seven-label voice set, so matching emotions are summed across
//! genders. `calm` becomes `neutral`; `disgusted` and `surprised` have no
//! source label and stay at zero.

use crate::error::{FusionError, Result};
use crate::labels::{LabelSet, VOICE_LABELS};
use crate::vector::{EmotionVector, Fallback};

/// Sum a ten-label gender-split vector into the seven voice labels
///
/// # Errors
/// `ShapeMismatch` unless `raw` uses the gender-split label set
pub fn collapse_voice_gender(raw: &EmotionVector) -> Result<EmotionVector> {
    let expected = LabelSet::voice_gender();
    if raw.labels() != &expected {
        return Err(FusionError::shape(expected.to_string(), raw.labels().to_string()));
    }

    let mut out = EmotionVector::zeros(LabelSet::voice());
    for (label, score) in raw.iter() {
        let emotion = match label.split_once('_') {
            Some((_, emotion)) => emotion,
            None => label,
        };
        let target = if emotion == "calm" { "neutral" } else { emotion };
        if let Some(i) = VOICE_LABELS.iter().position(|l| *l == target) {
            out.scores_mut()[i] += score;
        }
    }

    out.normalize(Fallback::Uniform);
    Ok(out)
}
