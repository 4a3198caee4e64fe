//! Error types for chat operations

use campus_store::StoreError;
use thiserror::Error;

/// Errors reported to the caller of a chat operation
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(StoreError),
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(StoreError),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Room limit reached: {0}")]
    RoomLimit(String),
}

impl ChatError {
    /// Stable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "validation_error",
            ChatError::PersistenceUnavailable(_) => "persistence_unavailable",
            ChatError::Forbidden(_) => "forbidden",
            ChatError::RoomLimit(_) => "room_limit",
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        if err.is_validation() {
            ChatError::Validation(err)
        } else {
            ChatError::PersistenceUnavailable(err)
        }
    }
}

/// Failure to hand an event to one session.
///
/// Never surfaced to the sender of a message; the broker only counts these.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Outbound queue full")]
    QueueFull,
    #[error("Session handle is stale")]
    Stale,
}
