//! Persistence seam and domain records.
//!
//! The surrounding booking system keeps lots, bookings, penalties, the sensor
//! registry, and the parking-event log in a hosted database. This crate only
//! depends on the `ParkingStore` trait; `memory::InMemoryStore` backs the
//! binary and the tests.

use crate::analysis::SensorReading;
use crate::events::{ParkingEvent, StoredEvent};
use serde::Deserialize;
use std::time::SystemTime;
use thiserror::Error;

pub mod memory;

pub type LotId = String;
pub type BookingId = String;
pub type UserId = String;
pub type PenaltyId = String;

#[derive(Debug, Clone, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub owner_user_id: UserId,
    pub available_spots: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    #[default]
    Active,
    Inactive,
}

/// Registry entry for one spot sensor, keyed by `sensor_id` + `api_key`.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorRecord {
    pub sensor_id: String,
    pub api_key: String,
    pub lot_id: LotId,
    #[serde(default)]
    pub status: SensorStatus,
    #[serde(skip)]
    pub last_heartbeat: Option<SystemTime>,
}

/// An authenticated sensor joined with its lot.
#[derive(Debug, Clone)]
pub struct SensorContext {
    pub sensor: SensorRecord,
    pub lot: Lot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

/// Where the booked vehicle currently stands relative to its spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Normal,
    Misparked,
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub id: BookingId,
    pub lot_id: LotId,
    pub user_id: UserId,
    pub spot_number: String,
    pub status: BookingStatus,
    pub parking_status: VehicleStatus,
    pub start: SystemTime,
    pub end: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyType {
    Misparking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyStatus {
    Pending,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct Penalty {
    pub id: PenaltyId,
    pub booking_id: BookingId,
    pub lot_id: LotId,
    pub user_id: UserId,
    pub penalty_type: PenaltyType,
    pub amount: f64,
    pub reason: String,
    pub status: PenaltyStatus,
    pub created_at: SystemTime,
}

/// Penalty fields decided by the processor; id, status, and creation time are
/// assigned by the store on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPenalty {
    pub booking_id: BookingId,
    pub lot_id: LotId,
    pub user_id: UserId,
    pub amount: f64,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(&'static str),
    #[error("store backend error: {0}")]
    Backend(String),
}

pub trait ParkingStore: Send + Sync {
    /// Resolve active sensor credentials to the sensor and its lot.
    fn authenticate_sensor(
        &self,
        sensor_id: &str,
        api_key: &str,
    ) -> Result<SensorContext, StoreError>;

    fn record_heartbeat(&self, sensor_id: &str, at: SystemTime) -> Result<(), StoreError>;

    /// The single `active` booking for (lot, spot) whose window contains `now`.
    fn active_booking(
        &self,
        lot_id: &str,
        spot_number: &str,
        now: SystemTime,
    ) -> Result<Option<Booking>, StoreError>;

    /// Most recent persisted readings for (lot, spot), newest first.
    fn recent_readings(
        &self,
        lot_id: &str,
        spot_number: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StoreError>;

    /// Append one event to the log. Event rows are never updated.
    fn append_event(&self, event: ParkingEvent) -> Result<StoredEvent, StoreError>;

    /// Newest event for a spot joined with its lot, if any reading was ever
    /// processed for it.
    fn latest_event_for_spot(
        &self,
        spot_number: &str,
    ) -> Result<Option<(StoredEvent, Lot)>, StoreError>;

    fn set_parking_status(
        &self,
        booking_id: &str,
        status: VehicleStatus,
    ) -> Result<(), StoreError>;

    fn set_booking_status(&self, booking_id: &str, status: BookingStatus)
    -> Result<(), StoreError>;

    /// Pending misparking penalty for a booking, if one exists.
    fn pending_mispark_penalty(&self, booking_id: &str) -> Result<Option<Penalty>, StoreError>;

    fn insert_penalty(&self, penalty: NewPenalty) -> Result<Penalty, StoreError>;

    /// Return one spot to the lot's available pool.
    fn release_spot(&self, lot_id: &str) -> Result<(), StoreError>;
}
