//! Error types shared across layers.

use thiserror::Error;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored value is invalid: {0}")]
    InvalidValue(String),

    #[error("Dialog state of user {user_id} is corrupt: {reason}")]
    CorruptDialogState { user_id: i64, reason: String },
}

/// Errors raised by use cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Link not found or inactive")]
    LinkUnavailable,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Link not found for message")]
    LinkNotFound,

    #[error("Reveal not allowed")]
    RevealForbidden,

    #[error(transparent)]
    Store(#[from] StoreError),
}
