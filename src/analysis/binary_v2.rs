//! Binary quality scoring: a spot is either parked well or it is not.

use crate::analysis::scorer::{QualityScorer, ScoreInput};

/// Current scoring revision: 0 for a misparked vehicle, 100 otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryV2Scorer;

impl QualityScorer for BinaryV2Scorer {
    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        if input.is_misparked { 0.0 } else { 100.0 }
    }
}
