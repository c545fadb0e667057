use crate::api::responses::{
    EventView, HealthResponse, HealthStatus, LiveErrorCode, LiveErrorResponse,
    LiveSuccessResponse, LotSummary, WebhookErrorCode, WebhookErrorResponse,
    WebhookSuccessResponse,
};
use crate::error::AppError;
use crate::events::{StoredEvent, effects::apply_side_effects};
use crate::state::AppState;
use crate::store::StoreError;
use crate::analysis::SensorReading;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}

fn fallback_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

// Webhook ingestion

/// Raw webhook body. Field spelling has varied across sensor firmware
/// revisions; `centre_distance` is accepted as an alias and the credential
/// pair may arrive via headers instead. `normalize` produces the canonical
/// request.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub sensor_id: Option<String>,
    pub api_key: Option<String>,
    pub spot_number: Option<String>,
    pub left_distance: Option<f64>,
    #[serde(alias = "centre_distance")]
    pub center_distance: Option<f64>,
    pub right_distance: Option<f64>,
    /// Epoch milliseconds; defaults to processing time.
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    pub sensor_id: String,
    pub api_key: String,
    pub spot_number: String,
    pub reading: SensorReading,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// Collapse the duck-typed payload into the canonical request, collecting
/// every missing required field into one rejection.
pub fn normalize(
    payload: &WebhookPayload,
    headers: &HeaderMap,
    now: SystemTime,
) -> Result<CanonicalRequest, AppError> {
    let sensor_id = payload
        .sensor_id
        .clone()
        .or_else(|| header_value(headers, "x-sensor-id"));
    let api_key = payload
        .api_key
        .clone()
        .or_else(|| header_value(headers, "x-api-key"));
    let spot_number = payload
        .spot_number
        .clone()
        .or_else(|| header_value(headers, "x-spot-number"));

    let mut missing = Vec::new();
    if sensor_id.is_none() {
        missing.push("sensor_id".to_string());
    }
    if api_key.is_none() {
        missing.push("api_key".to_string());
    }
    if spot_number.is_none() {
        missing.push("spot_number".to_string());
    }
    if payload.left_distance.is_none() {
        missing.push("left_distance".to_string());
    }
    if payload.center_distance.is_none() {
        missing.push("center_distance".to_string());
    }
    if payload.right_distance.is_none() {
        missing.push("right_distance".to_string());
    }

    let (
        Some(sensor_id),
        Some(api_key),
        Some(spot_number),
        Some(left),
        Some(center),
        Some(right),
    ) = (
        sensor_id,
        api_key,
        spot_number,
        payload.left_distance,
        payload.center_distance,
        payload.right_distance,
    )
    else {
        return Err(AppError::MissingFields(missing));
    };

    let timestamp = payload
        .timestamp
        .map(|ms| UNIX_EPOCH + Duration::from_millis(ms))
        .unwrap_or(now);

    Ok(CanonicalRequest {
        sensor_id,
        api_key,
        spot_number,
        reading: SensorReading::new(left, center, right, timestamp),
    })
}

pub enum WebhookResponse {
    Success(Box<WebhookSuccessResponse>),
    Error {
        status: StatusCode,
        body: WebhookErrorResponse,
    },
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        match self {
            WebhookResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            WebhookResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn post_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> impl IntoResponse {
    build_webhook_response(&state, &payload, &headers, SystemTime::now())
}

pub fn build_webhook_response(
    state: &AppState,
    payload: &WebhookPayload,
    headers: &HeaderMap,
    now: SystemTime,
) -> WebhookResponse {
    let canonical = match normalize(payload, headers, now) {
        Ok(canonical) => canonical,
        Err(err) => {
            return webhook_error(
                StatusCode::BAD_REQUEST,
                WebhookErrorCode::MissingFields,
                &err.to_string(),
            );
        }
    };

    let context = match state
        .store()
        .authenticate_sensor(&canonical.sensor_id, &canonical.api_key)
    {
        Ok(context) => context,
        Err(StoreError::NotFound(_)) => {
            warn!(
                sensor_id = %canonical.sensor_id,
                "Rejected webhook with invalid sensor credentials"
            );
            return webhook_error(
                StatusCode::UNAUTHORIZED,
                WebhookErrorCode::InvalidCredentials,
                &AppError::InvalidCredentials.to_string(),
            );
        }
        Err(err) => {
            return webhook_internal_error(&AppError::Store(err).to_string());
        }
    };

    if let Err(err) = state.store().record_heartbeat(&canonical.sensor_id, now) {
        warn!(sensor_id = %canonical.sensor_id, error = %err, "Failed to record heartbeat");
    }

    let history = state
        .store()
        .recent_readings(&context.lot.id, &canonical.spot_number, 2)
        .unwrap_or_else(|err| {
            warn!(error = %err, "History lookup failed, treating window as empty");
            Vec::new()
        });

    let booking = state
        .store()
        .active_booking(&context.lot.id, &canonical.spot_number, now)
        .unwrap_or_else(|err| {
            warn!(error = %err, "Active booking lookup failed");
            None
        });

    // Read-then-insert guard: checked here, immediately before processing,
    // so a concurrent request for the same booking can still race.
    let pending_penalty = booking
        .as_ref()
        .map(|booking| {
            state
                .store()
                .pending_mispark_penalty(&booking.id)
                .unwrap_or_else(|err| {
                    warn!(error = %err, "Pending penalty lookup failed");
                    None
                })
                .is_some()
        })
        .unwrap_or(false);

    let outcome = state.processor().process(crate::events::ProcessInput {
        reading: canonical.reading,
        lot: &context.lot,
        spot_number: &canonical.spot_number,
        history: &history,
        booking: booking.as_ref(),
        pending_penalty,
    });

    let stored = match state.store().append_event(outcome.event) {
        Ok(stored) => stored,
        Err(err) => {
            error!(error = %err, "Failed to create parking event");
            return webhook_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                WebhookErrorCode::EventWriteFailed,
                "Failed to create parking event",
            );
        }
    };

    apply_side_effects(state.store(), state.notifier(), &outcome.side_effects);

    let analysis = stored.event.sensor_data.analysis.clone();
    let message = if analysis.warnings.is_empty() {
        "Parking data recorded successfully".to_string()
    } else {
        analysis.warnings.join(". ")
    };

    let event = match event_view(&stored) {
        Ok(view) => view,
        Err(err) => {
            return webhook_internal_error(&err.to_string());
        }
    };

    WebhookResponse::Success(Box::new(WebhookSuccessResponse {
        success: true,
        event,
        analysis,
        message,
    }))
}

fn event_view(stored: &StoredEvent) -> Result<EventView, TimestampError> {
    Ok(EventView {
        id: stored.id,
        lot_id: stored.event.lot_id.clone(),
        booking_id: stored.event.booking_id.clone(),
        spot_number: stored.event.spot_number.clone(),
        event_type: stored.event.event_type,
        sensor_data: stored.event.sensor_data.clone(),
        detected_at: format_timestamp(stored.event.detected_at)?,
    })
}

fn webhook_error(
    status: StatusCode,
    error_code: WebhookErrorCode,
    message: &str,
) -> WebhookResponse {
    WebhookResponse::Error {
        status,
        body: WebhookErrorResponse {
            error_code,
            error_message: message.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

fn webhook_internal_error(message: &str) -> WebhookResponse {
    error!(
        message = message,
        "Internal error while handling /api/sensors/webhook"
    );
    WebhookResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: WebhookErrorResponse {
            error_code: WebhookErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

// Live spot view

pub enum LiveResponse {
    Success(Box<LiveSuccessResponse>),
    Error {
        status: StatusCode,
        body: LiveErrorResponse,
    },
}

impl IntoResponse for LiveResponse {
    fn into_response(self) -> Response {
        match self {
            LiveResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            LiveResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_live_spot(
    State(state): State<Arc<AppState>>,
    Path(spot_number): Path<String>,
) -> impl IntoResponse {
    build_live_response(&state, &spot_number)
}

pub fn build_live_response(state: &AppState, spot_number: &str) -> LiveResponse {
    let found = match state.store().latest_event_for_spot(spot_number) {
        Ok(found) => found,
        Err(err) => {
            return live_internal_error(&format!("latest event lookup failed: {err}"));
        }
    };

    let Some((stored, lot)) = found else {
        return LiveResponse::Error {
            status: StatusCode::NOT_FOUND,
            body: LiveErrorResponse {
                error_code: LiveErrorCode::SpotNotFound,
                error_message: "Spot not found".to_string(),
                timestamp: fallback_timestamp(),
            },
        };
    };

    let event = match event_view(&stored) {
        Ok(view) => view,
        Err(err) => {
            return live_internal_error(&err.to_string());
        }
    };

    LiveResponse::Success(Box::new(LiveSuccessResponse {
        event,
        parking_lot: LotSummary {
            name: lot.name,
            address: lot.address,
        },
    }))
}

fn live_internal_error(message: &str) -> LiveResponse {
    error!(
        message = message,
        "Internal error while handling /api/sensors/live"
    );
    LiveResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: LiveErrorResponse {
            error_code: LiveErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

// Health

pub async fn get_health() -> impl IntoResponse {
    build_health_response(SystemTime::now())
}

pub fn build_health_response(now: SystemTime) -> (StatusCode, Json<HealthResponse>) {
    let timestamp = format_timestamp(now).unwrap_or_else(|_| fallback_timestamp());
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: HealthStatus::Ok,
            timestamp,
        }),
    )
}
