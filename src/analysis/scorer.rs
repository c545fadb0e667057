//! Quality-scoring strategy trait.
//!
//! Scoring has been revised over the system's life; the scheme is selected
//! via the `scoring` field in the classifier config and loaded at startup.

use crate::analysis::{Alignment, SensorReading};

/// Everything a scorer may consider for one reading. The alignment verdict
/// and mispark flag are computed by the classifier before scoring runs.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub reading: &'a SensorReading,
    pub alignment: Alignment,
    pub alignment_diff_cm: f64,
    pub is_misparked: bool,
}

/// Strategy for turning an alignment verdict into a 0-100 quality score.
pub trait QualityScorer: Send + Sync + std::fmt::Debug {
    fn score(&self, input: &ScoreInput<'_>) -> f64;
}
