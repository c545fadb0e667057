use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/sensors/webhook", post(handlers::post_webhook))
        .route(
            "/api/sensors/live/{spot_number}",
            get(handlers::get_live_spot),
        )
        .route("/api/health", get(handlers::get_health))
        .with_state(state)
}
