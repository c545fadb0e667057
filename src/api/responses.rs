use crate::analysis::ParkingAnalysis;
use crate::events::{EventPayload, EventType};
use serde::Serialize;

/// Stored event as rendered in API responses; `detected_at` is RFC 3339.
#[derive(Debug, Serialize)]
pub struct EventView {
    pub id: u64,
    pub lot_id: String,
    pub booking_id: Option<String>,
    pub spot_number: String,
    pub event_type: EventType,
    pub sensor_data: EventPayload,
    pub detected_at: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookSuccessResponse {
    pub success: bool,
    pub event: EventView,
    pub analysis: ParkingAnalysis,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookErrorCode {
    MissingFields,
    InvalidCredentials,
    EventWriteFailed,
    InternalError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WebhookErrorResponse {
    pub error_code: WebhookErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct LotSummary {
    pub name: String,
    pub address: String,
}

/// Live view of a spot: its newest event joined with lot context.
#[derive(Debug, Serialize)]
pub struct LiveSuccessResponse {
    #[serde(flatten)]
    pub event: EventView,
    pub parking_lot: LotSummary,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveErrorCode {
    SpotNotFound,
    InternalError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LiveErrorResponse {
    pub error_code: LiveErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: String,
}
