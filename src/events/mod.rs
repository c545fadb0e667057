//! Sensor event processing.
//!
//! `Processor::process` is the decision core: one reading plus short per-spot
//! history and booking context in, one append-only `ParkingEvent` plus an
//! ordered side-effect list out. Persistence and notification happen in
//! `effects::apply_side_effects`, never here.

use crate::analysis::{
    ClassifierConfig, OccupancyStatus, ParkingAnalysis, SensorReading, classify,
    scorer::QualityScorer,
};
use crate::notify::Notification;
use crate::store::{Booking, BookingStatus, BookingId, Lot, LotId, UserId, VehicleStatus};
use serde::Serialize;
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod effects;

/// Spot status reduced to the three values bookings care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkingStatus {
    Misparked,
    Parked,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Entry,
    Exit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SensorUpdate,
    Entry,
    Exit,
    Misparked,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawDistances {
    pub left_distance: f64,
    pub center_distance: f64,
    pub right_distance: f64,
}

impl From<&SensorReading> for RawDistances {
    fn from(reading: &SensorReading) -> Self {
        Self {
            left_distance: reading.left_cm,
            center_distance: reading.center_cm,
            right_distance: reading.right_cm,
        }
    }
}

/// Everything recorded alongside one processed reading. Embedded in the event
/// row; `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPayload {
    pub raw_distances: RawDistances,
    pub analysis: ParkingAnalysis,
    pub stable: bool,
    pub transition: Transition,
    pub status: ParkingStatus,
    pub timestamp: u64,
}

impl EventPayload {
    /// Rebuild the canonical reading this payload was produced from.
    pub fn reading(&self) -> SensorReading {
        SensorReading::new(
            self.raw_distances.left_distance,
            self.raw_distances.center_distance,
            self.raw_distances.right_distance,
            UNIX_EPOCH + Duration::from_millis(self.timestamp),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParkingEvent {
    pub lot_id: LotId,
    pub booking_id: Option<BookingId>,
    pub spot_number: String,
    pub event_type: EventType,
    pub sensor_data: EventPayload,
    pub detected_at: SystemTime,
}

/// An event row as persisted, with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub id: u64,
    pub event: ParkingEvent,
}

/// One requested state change or notification. The processor only decides;
/// execution order follows list order.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    SetParkingStatus {
        booking_id: BookingId,
        status: VehicleStatus,
    },
    IssuePenalty {
        booking_id: BookingId,
        lot_id: LotId,
        user_id: UserId,
        amount: f64,
        reason: String,
    },
    ActivateBooking {
        booking_id: BookingId,
    },
    CompleteBooking {
        booking_id: BookingId,
    },
    ReleaseSpot {
        lot_id: LotId,
    },
    Notify {
        user_id: UserId,
        notification: Notification,
    },
}

pub struct ProcessInput<'a> {
    pub reading: SensorReading,
    pub lot: &'a Lot,
    pub spot_number: &'a str,
    /// Prior readings for this (lot, spot), newest first, at most two.
    pub history: &'a [SensorReading],
    pub booking: Option<&'a Booking>,
    /// Whether a pending misparking penalty already exists for the booking.
    pub pending_penalty: bool,
}

#[derive(Debug)]
pub struct ProcessOutcome {
    pub event: ParkingEvent,
    pub side_effects: Vec<SideEffect>,
}

/// Reduce a full analysis to the booking-facing status.
pub fn simplify(analysis: &ParkingAnalysis) -> ParkingStatus {
    match analysis.status {
        OccupancyStatus::Occupied if analysis.is_misparked => ParkingStatus::Misparked,
        OccupancyStatus::Occupied => ParkingStatus::Parked,
        OccupancyStatus::Empty => ParkingStatus::Empty,
    }
}

#[derive(Debug)]
pub struct Processor {
    classifier: ClassifierConfig,
    scorer: Box<dyn QualityScorer>,
    penalty_amount: f64,
}

impl Processor {
    pub fn new(
        classifier: ClassifierConfig,
        scorer: Box<dyn QualityScorer>,
        penalty_amount: f64,
    ) -> Self {
        Self {
            classifier,
            scorer,
            penalty_amount,
        }
    }

    pub fn classifier_config(&self) -> &ClassifierConfig {
        &self.classifier
    }

    pub fn classify(&self, reading: &SensorReading) -> ParkingAnalysis {
        classify(reading, &self.classifier, self.scorer.as_ref())
    }

    pub fn process(&self, input: ProcessInput<'_>) -> ProcessOutcome {
        let analysis = self.classify(&input.reading);
        let status = simplify(&analysis);

        // Two identical consecutive prior readings make the window stable;
        // anything less suppresses transition detection entirely.
        let stable_prior = match input.history {
            [latest, previous] if latest.same_distances(previous) => Some(*latest),
            _ => None,
        };
        let stable = stable_prior.is_some();
        let last_stable_status = stable_prior.map(|prior| simplify(&self.classify(&prior)));

        let transition = match last_stable_status {
            Some(ParkingStatus::Empty) if status != ParkingStatus::Empty => Transition::Entry,
            Some(prev) if prev != ParkingStatus::Empty && status == ParkingStatus::Empty => {
                Transition::Exit
            }
            _ => Transition::None,
        };

        let event_type = match transition {
            Transition::Entry => EventType::Entry,
            Transition::Exit => EventType::Exit,
            Transition::None if status == ParkingStatus::Misparked => EventType::Misparked,
            Transition::None => EventType::SensorUpdate,
        };

        let side_effects = self.decide_side_effects(&input, &analysis, event_type);

        let event = ParkingEvent {
            lot_id: input.lot.id.clone(),
            booking_id: input.booking.map(|booking| booking.id.clone()),
            spot_number: input.spot_number.to_string(),
            event_type,
            sensor_data: EventPayload {
                raw_distances: RawDistances::from(&input.reading),
                analysis,
                stable,
                transition,
                status,
                timestamp: input.reading.timestamp_ms(),
            },
            detected_at: input.reading.timestamp,
        };

        ProcessOutcome {
            event,
            side_effects,
        }
    }

    fn decide_side_effects(
        &self,
        input: &ProcessInput<'_>,
        analysis: &ParkingAnalysis,
        event_type: EventType,
    ) -> Vec<SideEffect> {
        let mut effects = Vec::new();
        let Some(booking) = input.booking else {
            return effects;
        };
        let lot = input.lot;
        let spot = input.spot_number;

        if analysis.is_misparked {
            effects.push(SideEffect::SetParkingStatus {
                booking_id: booking.id.clone(),
                status: VehicleStatus::Misparked,
            });
            if !input.pending_penalty {
                let score = analysis.quality_score;
                effects.push(SideEffect::IssuePenalty {
                    booking_id: booking.id.clone(),
                    lot_id: lot.id.clone(),
                    user_id: booking.user_id.clone(),
                    amount: self.penalty_amount,
                    reason: format!(
                        "Parking quality score: {score}/100. {}",
                        analysis.warnings.join(". ")
                    ),
                });
                effects.push(SideEffect::Notify {
                    user_id: booking.user_id.clone(),
                    notification: Notification {
                        title: "Misparking Detected!".to_string(),
                        body: format!(
                            "Quality score: {score}/100. Please reposition your vehicle. \
                             Penalty: ${}",
                            self.penalty_amount
                        ),
                        data: json!({
                            "type": "misparking",
                            "booking_id": booking.id,
                        }),
                    },
                });
                effects.push(SideEffect::Notify {
                    user_id: lot.owner_user_id.clone(),
                    notification: Notification {
                        title: "Misparking Alert".to_string(),
                        body: format!(
                            "Vehicle misparked at {}, Spot {spot}. Quality: {score}/100",
                            lot.name
                        ),
                        data: json!({
                            "type": "misparking_owner",
                            "booking_id": booking.id,
                            "lot_id": lot.id,
                        }),
                    },
                });
            }
        } else if booking.parking_status == VehicleStatus::Misparked {
            effects.push(SideEffect::SetParkingStatus {
                booking_id: booking.id.clone(),
                status: VehicleStatus::Normal,
            });
            effects.push(SideEffect::Notify {
                user_id: booking.user_id.clone(),
                notification: Notification {
                    title: "Parking Corrected".to_string(),
                    body: format!(
                        "Thank you for repositioning your vehicle. Quality score: {}/100",
                        analysis.quality_score
                    ),
                    data: json!({
                        "type": "parking_corrected",
                        "booking_id": booking.id,
                    }),
                },
            });
        }

        if event_type == EventType::Entry {
            if booking.status == BookingStatus::Upcoming {
                effects.push(SideEffect::ActivateBooking {
                    booking_id: booking.id.clone(),
                });
            }
            effects.push(SideEffect::Notify {
                user_id: lot.owner_user_id.clone(),
                notification: Notification {
                    title: "Vehicle Entry".to_string(),
                    body: format!("Vehicle entered {}, Spot {spot}", lot.name),
                    data: json!({
                        "type": "entry",
                        "booking_id": booking.id,
                        "lot_id": lot.id,
                    }),
                },
            });
        }

        if event_type == EventType::Exit {
            effects.push(SideEffect::CompleteBooking {
                booking_id: booking.id.clone(),
            });
            effects.push(SideEffect::ReleaseSpot {
                lot_id: lot.id.clone(),
            });
            effects.push(SideEffect::Notify {
                user_id: booking.user_id.clone(),
                notification: Notification {
                    title: "Parking Session Completed".to_string(),
                    body: format!("Thank you for using {}", lot.name),
                    data: json!({
                        "type": "exit",
                        "booking_id": booking.id,
                    }),
                },
            });
            effects.push(SideEffect::Notify {
                user_id: lot.owner_user_id.clone(),
                notification: Notification {
                    title: "Vehicle Exit".to_string(),
                    body: format!("Vehicle exited {}, Spot {spot}", lot.name),
                    data: json!({
                        "type": "exit_owner",
                        "booking_id": booking.id,
                        "lot_id": lot.id,
                    }),
                },
            });
        }

        effects
    }
}
