use thiserror::Error;

/// Errors surfaced by the reading-ingestion flow. Validation and credential
/// failures map to 4xx responses; store failures map to 5xx.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Invalid sensor credentials")]
    InvalidCredentials,
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}
