//! Parking-quality classification from three-beam distance readings.
//!
//! A spot sensor reports three distances (left, center, right). `classify`
//! turns one reading into a `ParkingAnalysis`: occupancy, lateral alignment,
//! a mispark verdict, and a quality score produced by the configured scorer.

use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod binary_v2;
pub mod deduction_v1;
pub mod scorer;

use scorer::{QualityScorer, ScoreInput};
use thiserror::Error;

/// One sample from a spot's three ultrasonic sensors, distances in cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub left_cm: f64,
    pub center_cm: f64,
    pub right_cm: f64,
    pub timestamp: SystemTime,
}

impl SensorReading {
    pub fn new(left_cm: f64, center_cm: f64, right_cm: f64, timestamp: SystemTime) -> Self {
        Self {
            left_cm,
            center_cm,
            right_cm,
            timestamp,
        }
    }

    /// Exact (bit-level) equality of the three distances, NaN-safe.
    pub fn same_distances(&self, other: &SensorReading) -> bool {
        self.left_cm.to_bits() == other.left_cm.to_bits()
            && self.center_cm.to_bits() == other.center_cm.to_bits()
            && self.right_cm.to_bits() == other.right_cm.to_bits()
    }

    /// Milliseconds since the Unix epoch, saturating at zero for pre-epoch times.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyStatus {
    Occupied,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Centered,
    LeftBiased,
    RightBiased,
    SeverelyMisaligned,
}

impl Alignment {
    /// Human-readable form used in warning messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Centered => "centered",
            Self::LeftBiased => "left biased",
            Self::RightBiased => "right biased",
            Self::SeverelyMisaligned => "severely misaligned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentMetrics {
    pub center_offset_cm: f64,
    pub angle_deviation_deg: f64,
    pub space_utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkingAnalysis {
    pub status: OccupancyStatus,
    pub alignment: Alignment,
    pub is_misparked: bool,
    pub quality_score: f64,
    pub warnings: Vec<String>,
    pub metrics: AlignmentMetrics,
}

/// Distance thresholds driving classification, all in cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// All three sensors at or beyond this distance may indicate an empty spot.
    pub unoccupied_distance_cm: f64,
    /// Maximum spread between the three sensors for the empty fast path.
    pub unoccupied_tolerance_cm: f64,
    /// Center distance at or below this reads as occupied.
    pub occupied_threshold_cm: f64,
    /// Left/right difference up to this counts as centered.
    pub alignment_threshold_cm: f64,
    /// Left/right difference at or beyond this counts as misparked.
    pub mispark_threshold_cm: f64,
    /// Left/right difference at or beyond this counts as severe misalignment.
    pub severe_misalign_threshold_cm: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            unoccupied_distance_cm: 200.0,
            unoccupied_tolerance_cm: 10.0,
            occupied_threshold_cm: 80.0,
            alignment_threshold_cm: 10.0,
            mispark_threshold_cm: 25.0,
            severe_misalign_threshold_cm: 80.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("unknown scoring strategy: {0}")]
    Unknown(String),
}

/// Build the quality scorer selected by name in the classifier config.
pub fn create_scorer(
    name: &str,
    deduction_params: Option<deduction_v1::DeductionV1Params>,
) -> Result<Box<dyn QualityScorer>, ScoringError> {
    match name {
        "binary_v2" => Ok(Box::new(binary_v2::BinaryV2Scorer)),
        "deduction_v1" => Ok(Box::new(deduction_v1::DeductionV1Scorer::new(
            deduction_params.unwrap_or_default(),
        ))),
        other => Err(ScoringError::Unknown(other.to_string())),
    }
}

/// Classify one reading. Pure: same reading, config, and scorer always
/// produce the same analysis.
pub fn classify(
    reading: &SensorReading,
    config: &ClassifierConfig,
    scorer: &dyn QualityScorer,
) -> ParkingAnalysis {
    let SensorReading {
        left_cm: left,
        center_cm: center,
        right_cm: right,
        ..
    } = *reading;

    let min = left.min(center).min(right);
    let max = left.max(center).max(right);

    // All three sensors agreeing on "far" is definitive emptiness.
    if min >= config.unoccupied_distance_cm && max - min <= config.unoccupied_tolerance_cm {
        return ParkingAnalysis {
            status: OccupancyStatus::Empty,
            alignment: Alignment::Centered,
            is_misparked: false,
            quality_score: 100.0,
            warnings: Vec::new(),
            metrics: AlignmentMetrics {
                center_offset_cm: center,
                angle_deviation_deg: 0.0,
                space_utilization: 0.0,
            },
        };
    }

    // Center sensor alone gates occupancy past the fast path.
    let status = if center <= config.occupied_threshold_cm {
        OccupancyStatus::Occupied
    } else {
        OccupancyStatus::Empty
    };

    let alignment_diff = (left - right).abs();
    let biased = if left < right {
        Alignment::LeftBiased
    } else {
        Alignment::RightBiased
    };

    let mut warnings = Vec::new();
    let alignment = if alignment_diff <= config.alignment_threshold_cm {
        Alignment::Centered
    } else if alignment_diff <= config.mispark_threshold_cm {
        warnings.push(format!(
            "Vehicle slightly {} by {alignment_diff:.1}cm",
            biased.label()
        ));
        biased
    } else if alignment_diff < config.severe_misalign_threshold_cm {
        warnings.push(format!(
            "Misparking suspected: {} by {alignment_diff:.1}cm",
            biased.label()
        ));
        biased
    } else {
        warnings.push(format!(
            "Severe misalignment detected: {alignment_diff:.1}cm difference"
        ));
        Alignment::SeverelyMisaligned
    };

    let is_misparked = alignment == Alignment::SeverelyMisaligned
        || alignment_diff >= config.mispark_threshold_cm;

    let quality_score = scorer.score(&ScoreInput {
        reading,
        alignment,
        alignment_diff_cm: alignment_diff,
        is_misparked,
    });

    ParkingAnalysis {
        status,
        alignment,
        is_misparked,
        quality_score,
        warnings,
        metrics: AlignmentMetrics {
            center_offset_cm: center,
            angle_deviation_deg: 0.0,
            space_utilization: 0.0,
        },
    }
}
