//! Side-effect execution against the store and notifier.
//!
//! Every effect is best-effort: a failed booking update, penalty insert, or
//! notification is logged and skipped so the remaining effects still run and
//! the webhook response stays a success. The event append itself is handled
//! by the caller before this runs and is the only fatal write.

use crate::events::SideEffect;
use crate::notify::Notifier;
use crate::store::{BookingStatus, NewPenalty, ParkingStore};
use tracing::warn;

pub fn apply_side_effects(
    store: &dyn ParkingStore,
    notifier: &dyn Notifier,
    effects: &[SideEffect],
) {
    for effect in effects {
        match effect {
            SideEffect::SetParkingStatus { booking_id, status } => {
                if let Err(err) = store.set_parking_status(booking_id, *status) {
                    warn!(booking_id = %booking_id, error = %err, "Failed to update parking status");
                }
            }
            SideEffect::IssuePenalty {
                booking_id,
                lot_id,
                user_id,
                amount,
                reason,
            } => {
                let penalty = NewPenalty {
                    booking_id: booking_id.clone(),
                    lot_id: lot_id.clone(),
                    user_id: user_id.clone(),
                    amount: *amount,
                    reason: reason.clone(),
                };
                if let Err(err) = store.insert_penalty(penalty) {
                    warn!(booking_id = %booking_id, error = %err, "Failed to insert penalty");
                }
            }
            SideEffect::ActivateBooking { booking_id } => {
                if let Err(err) = store.set_booking_status(booking_id, BookingStatus::Active) {
                    warn!(booking_id = %booking_id, error = %err, "Failed to activate booking");
                }
            }
            SideEffect::CompleteBooking { booking_id } => {
                if let Err(err) = store.set_booking_status(booking_id, BookingStatus::Completed) {
                    warn!(booking_id = %booking_id, error = %err, "Failed to complete booking");
                }
            }
            SideEffect::ReleaseSpot { lot_id } => {
                if let Err(err) = store.release_spot(lot_id) {
                    warn!(lot_id = %lot_id, error = %err, "Failed to release spot");
                }
            }
            SideEffect::Notify {
                user_id,
                notification,
            } => {
                if let Err(err) = notifier.send(user_id, notification) {
                    warn!(
                        user_id = %user_id,
                        title = %notification.title,
                        error = %err,
                        "Failed to send notification"
                    );
                }
            }
        }
    }
}
