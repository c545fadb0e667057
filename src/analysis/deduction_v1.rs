//! Deduction-based quality scoring, the scheme that preceded `binary_v2`.
//!
//! Starts at 100 and deducts per-cm penalties for lateral asymmetry beyond
//! the free band and for stopping short of or past the ideal center distance.

use crate::analysis::scorer::{QualityScorer, ScoreInput};
use serde::Deserialize;

/// Deduction V1 parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct DeductionV1Params {
    /// Points deducted per cm of left/right asymmetry beyond `free_asymmetry_cm`.
    pub asymmetry_penalty_per_cm: f64,
    /// Asymmetry tolerated without deduction.
    pub free_asymmetry_cm: f64,
    /// Points deducted per cm of center-distance deviation from `ideal_stop_cm`.
    pub offset_penalty_per_cm: f64,
    /// Center distance of a perfectly positioned vehicle.
    pub ideal_stop_cm: f64,
}

impl Default for DeductionV1Params {
    fn default() -> Self {
        Self {
            asymmetry_penalty_per_cm: 1.5,
            free_asymmetry_cm: 10.0,
            offset_penalty_per_cm: 0.5,
            ideal_stop_cm: 40.0,
        }
    }
}

#[derive(Debug)]
pub struct DeductionV1Scorer {
    pub params: DeductionV1Params,
}

impl DeductionV1Scorer {
    pub fn new(params: DeductionV1Params) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(DeductionV1Params::default())
    }
}

impl QualityScorer for DeductionV1Scorer {
    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        let asymmetry_over = (input.alignment_diff_cm - self.params.free_asymmetry_cm).max(0.0);
        let offset = (input.reading.center_cm - self.params.ideal_stop_cm).abs();

        let score = 100.0
            - asymmetry_over * self.params.asymmetry_penalty_per_cm
            - offset * self.params.offset_penalty_per_cm;
        score.clamp(0.0, 100.0)
    }
}
