use axum::http::HeaderMap;
use spotwatch::analysis::ClassifierConfig;
use spotwatch::analysis::binary_v2::BinaryV2Scorer;
use spotwatch::api::handlers::{WebhookPayload, WebhookResponse, build_webhook_response};
use spotwatch::events::{EventType, Processor};
use spotwatch::notify::mock::RecordingNotifier;
use spotwatch::state::AppState;
use spotwatch::store::memory::InMemoryStore;
use spotwatch::store::{
    Booking, BookingStatus, Lot, ParkingStore, SensorRecord, SensorStatus, VehicleStatus,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

struct Harness {
    state: AppState,
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    store
        .insert_lot(Lot {
            id: "lot-1".to_string(),
            name: "Harbor Street Parking".to_string(),
            address: "12 Harbor St".to_string(),
            owner_user_id: "owner-1".to_string(),
            available_spots: 5,
        })
        .expect("seed lot");
    store
        .insert_sensor(SensorRecord {
            sensor_id: "ESP32_harbor_A1".to_string(),
            api_key: "secret".to_string(),
            lot_id: "lot-1".to_string(),
            status: SensorStatus::Active,
            last_heartbeat: None,
        })
        .expect("seed sensor");
    store
        .insert_booking(Booking {
            id: "booking-1".to_string(),
            lot_id: "lot-1".to_string(),
            user_id: "renter-1".to_string(),
            spot_number: "A1".to_string(),
            status: BookingStatus::Active,
            parking_status: VehicleStatus::Normal,
            start: UNIX_EPOCH,
            end: UNIX_EPOCH + Duration::from_secs(7200),
        })
        .expect("seed booking");

    let notifier = Arc::new(RecordingNotifier::new());
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn spotwatch::store::ParkingStore>,
        Arc::clone(&notifier) as Arc<dyn spotwatch::notify::Notifier>,
        Processor::new(ClassifierConfig::default(), Box::new(BinaryV2Scorer), 50.0),
    );
    Harness {
        state,
        store,
        notifier,
    }
}

fn payload(left: f64, center: f64, right: f64, ts_ms: u64) -> WebhookPayload {
    serde_json::from_value(serde_json::json!({
        "sensor_id": "ESP32_harbor_A1",
        "api_key": "secret",
        "spot_number": "A1",
        "left_distance": left,
        "center_distance": center,
        "right_distance": right,
        "timestamp": ts_ms,
    }))
    .expect("deserialize payload")
}

fn post(harness: &Harness, body: &WebhookPayload) -> EventType {
    let now = SystemTime::now();
    let response = build_webhook_response(&harness.state, body, &HeaderMap::new(), now);
    match response {
        WebhookResponse::Success(success) => success.event.event_type,
        WebhookResponse::Error { status, body } => {
            panic!("webhook failed: {status} {}", body.error_message);
        }
    }
}

#[test]
fn full_session_entry_mispark_correction_exit() {
    let harness = harness();

    // Empty spot, sampled twice with identical distances: the window becomes
    // stable at "empty".
    assert_eq!(
        post(&harness, &payload(250.0, 255.0, 252.0, 1_000)),
        EventType::SensorUpdate
    );
    assert_eq!(
        post(&harness, &payload(250.0, 255.0, 252.0, 2_000)),
        EventType::SensorUpdate
    );

    // Vehicle arrives misparked: entry transition wins the event type while
    // the mispark side effects still run.
    assert_eq!(
        post(&harness, &payload(10.0, 40.0, 60.0, 3_000)),
        EventType::Entry
    );
    let booking = harness
        .store
        .booking("booking-1")
        .expect("query booking")
        .expect("booking exists");
    assert_eq!(booking.parking_status, VehicleStatus::Misparked);
    assert_eq!(
        harness
            .store
            .penalties_for_booking("booking-1")
            .expect("query penalties")
            .len(),
        1
    );
    let titles: Vec<String> = harness
        .notifier
        .sent()
        .iter()
        .map(|sent| sent.notification.title.clone())
        .collect();
    assert_eq!(
        titles,
        vec!["Misparking Detected!", "Misparking Alert", "Vehicle Entry"]
    );

    // Still misparked on the next sample: no second penalty, no new alerts.
    assert_eq!(
        post(&harness, &payload(10.0, 40.0, 61.0, 4_000)),
        EventType::Misparked
    );
    assert_eq!(
        harness
            .store
            .penalties_for_booking("booking-1")
            .expect("query penalties")
            .len(),
        1
    );
    assert_eq!(harness.notifier.sent().len(), 3);

    // Repositioned correctly: parking status resets and the renter hears
    // about it.
    assert_eq!(
        post(&harness, &payload(30.0, 40.0, 32.0, 5_000)),
        EventType::SensorUpdate
    );
    let booking = harness
        .store
        .booking("booking-1")
        .expect("query booking")
        .expect("booking exists");
    assert_eq!(booking.parking_status, VehicleStatus::Normal);
    assert_eq!(
        harness
            .notifier
            .sent()
            .last()
            .map(|sent| sent.notification.title.clone()),
        Some("Parking Corrected".to_string())
    );

    // Two identical parked samples make the window stable at "parked"...
    assert_eq!(
        post(&harness, &payload(30.0, 40.0, 32.0, 6_000)),
        EventType::SensorUpdate
    );

    // ...so the next empty reading is an exit: booking completes and the spot
    // returns to the pool.
    assert_eq!(
        post(&harness, &payload(250.0, 255.0, 252.0, 7_000)),
        EventType::Exit
    );
    let booking = harness
        .store
        .booking("booking-1")
        .expect("query booking")
        .expect("booking exists");
    assert_eq!(booking.status, BookingStatus::Completed);
    let lot = harness
        .store
        .lot("lot-1")
        .expect("query lot")
        .expect("lot exists");
    assert_eq!(lot.available_spots, 6);
    let titles: Vec<String> = harness
        .notifier
        .sent()
        .iter()
        .skip(4)
        .map(|sent| sent.notification.title.clone())
        .collect();
    assert_eq!(titles, vec!["Parking Session Completed", "Vehicle Exit"]);

    // Every processed reading appended exactly one event row.
    assert_eq!(harness.store.event_count().expect("count events"), 7);
}

#[test]
fn noisy_single_samples_never_trigger_transitions() {
    let harness = harness();

    // Alternating readings: the two-sample window never stabilizes, so no
    // entry or exit is ever inferred.
    let sequence = [
        (250.0, 255.0, 252.0),
        (30.0, 40.0, 32.0),
        (250.0, 255.0, 252.0),
        (30.0, 40.0, 32.0),
    ];
    for (index, (left, center, right)) in sequence.into_iter().enumerate() {
        let event_type = post(
            &harness,
            &payload(left, center, right, 1_000 * (index as u64 + 1)),
        );
        assert_eq!(event_type, EventType::SensorUpdate);
    }

    let booking = harness
        .store
        .booking("booking-1")
        .expect("query booking")
        .expect("booking exists");
    assert_eq!(booking.status, BookingStatus::Active);
    assert!(harness.notifier.sent().is_empty());
}

#[test]
fn heartbeat_recorded_on_successful_webhook() {
    let harness = harness();
    post(&harness, &payload(250.0, 255.0, 252.0, 1_000));

    let context = harness
        .store
        .authenticate_sensor("ESP32_harbor_A1", "secret")
        .expect("sensor still active");
    assert!(context.sensor.last_heartbeat.is_some());
}
