//! In-memory `ParkingStore` used by the binary and the tests.
//!
//! Tables live behind one `Mutex`; ids are assigned from simple counters.
//! The pending-penalty guard is the same read-then-insert the hosted store
//! performs, so two concurrent misparked readings for one booking can still
//! both insert.

use crate::analysis::SensorReading;
use crate::events::{ParkingEvent, StoredEvent};
use crate::store::{
    Booking, BookingStatus, Lot, NewPenalty, ParkingStore, Penalty, PenaltyStatus, PenaltyType,
    SensorContext, SensorRecord, SensorStatus, StoreError, VehicleStatus,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Debug, Default)]
struct Tables {
    sensors: Vec<SensorRecord>,
    lots: HashMap<String, Lot>,
    bookings: HashMap<String, Booking>,
    events: Vec<StoredEvent>,
    penalties: Vec<Penalty>,
    next_event_id: u64,
    next_penalty_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    pub fn insert_lot(&self, lot: Lot) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.lots.insert(lot.id.clone(), lot);
        Ok(())
    }

    pub fn insert_sensor(&self, sensor: SensorRecord) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.sensors.push(sensor);
        Ok(())
    }

    pub fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.bookings.insert(booking.id.clone(), booking);
        Ok(())
    }

    pub fn booking(&self, booking_id: &str) -> Result<Option<Booking>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.bookings.get(booking_id).cloned())
    }

    pub fn lot(&self, lot_id: &str) -> Result<Option<Lot>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.lots.get(lot_id).cloned())
    }

    pub fn penalties_for_booking(&self, booking_id: &str) -> Result<Vec<Penalty>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .penalties
            .iter()
            .filter(|penalty| penalty.booking_id == booking_id)
            .cloned()
            .collect())
    }

    pub fn event_count(&self) -> Result<usize, StoreError> {
        let tables = self.lock()?;
        Ok(tables.events.len())
    }
}

impl ParkingStore for InMemoryStore {
    fn authenticate_sensor(
        &self,
        sensor_id: &str,
        api_key: &str,
    ) -> Result<SensorContext, StoreError> {
        let tables = self.lock()?;
        let sensor = tables
            .sensors
            .iter()
            .find(|sensor| {
                sensor.sensor_id == sensor_id
                    && sensor.api_key == api_key
                    && sensor.status == SensorStatus::Active
            })
            .cloned()
            .ok_or(StoreError::NotFound("sensor"))?;
        let lot = tables
            .lots
            .get(&sensor.lot_id)
            .cloned()
            .ok_or(StoreError::NotFound("lot"))?;
        Ok(SensorContext { sensor, lot })
    }

    fn record_heartbeat(&self, sensor_id: &str, at: SystemTime) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let sensor = tables
            .sensors
            .iter_mut()
            .find(|sensor| sensor.sensor_id == sensor_id)
            .ok_or(StoreError::NotFound("sensor"))?;
        sensor.last_heartbeat = Some(at);
        Ok(())
    }

    fn active_booking(
        &self,
        lot_id: &str,
        spot_number: &str,
        now: SystemTime,
    ) -> Result<Option<Booking>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .bookings
            .values()
            .find(|booking| {
                booking.lot_id == lot_id
                    && booking.spot_number == spot_number
                    && booking.status == BookingStatus::Active
                    && booking.start <= now
                    && booking.end >= now
            })
            .cloned())
    }

    fn recent_readings(
        &self,
        lot_id: &str,
        spot_number: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .events
            .iter()
            .rev()
            .filter(|stored| {
                stored.event.lot_id == lot_id && stored.event.spot_number == spot_number
            })
            .take(limit)
            .map(|stored| stored.event.sensor_data.reading())
            .collect())
    }

    fn append_event(&self, event: ParkingEvent) -> Result<StoredEvent, StoreError> {
        let mut tables = self.lock()?;
        tables.next_event_id += 1;
        let stored = StoredEvent {
            id: tables.next_event_id,
            event,
        };
        tables.events.push(stored.clone());
        Ok(stored)
    }

    fn latest_event_for_spot(
        &self,
        spot_number: &str,
    ) -> Result<Option<(StoredEvent, Lot)>, StoreError> {
        let tables = self.lock()?;
        let Some(stored) = tables
            .events
            .iter()
            .rev()
            .find(|stored| stored.event.spot_number == spot_number)
            .cloned()
        else {
            return Ok(None);
        };
        let lot = tables
            .lots
            .get(&stored.event.lot_id)
            .cloned()
            .ok_or(StoreError::NotFound("lot"))?;
        Ok(Some((stored, lot)))
    }

    fn set_parking_status(
        &self,
        booking_id: &str,
        status: VehicleStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let booking = tables
            .bookings
            .get_mut(booking_id)
            .ok_or(StoreError::NotFound("booking"))?;
        booking.parking_status = status;
        Ok(())
    }

    fn set_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let booking = tables
            .bookings
            .get_mut(booking_id)
            .ok_or(StoreError::NotFound("booking"))?;
        booking.status = status;
        Ok(())
    }

    fn pending_mispark_penalty(&self, booking_id: &str) -> Result<Option<Penalty>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .penalties
            .iter()
            .find(|penalty| {
                penalty.booking_id == booking_id
                    && penalty.penalty_type == PenaltyType::Misparking
                    && penalty.status == PenaltyStatus::Pending
            })
            .cloned())
    }

    fn insert_penalty(&self, penalty: NewPenalty) -> Result<Penalty, StoreError> {
        let mut tables = self.lock()?;
        tables.next_penalty_id += 1;
        let row = Penalty {
            id: format!("penalty-{}", tables.next_penalty_id),
            booking_id: penalty.booking_id,
            lot_id: penalty.lot_id,
            user_id: penalty.user_id,
            penalty_type: PenaltyType::Misparking,
            amount: penalty.amount,
            reason: penalty.reason,
            status: PenaltyStatus::Pending,
            created_at: SystemTime::now(),
        };
        tables.penalties.push(row.clone());
        Ok(row)
    }

    fn release_spot(&self, lot_id: &str) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let lot = tables
            .lots
            .get_mut(lot_id)
            .ok_or(StoreError::NotFound("lot"))?;
        lot.available_spots += 1;
        Ok(())
    }
}
