//! Error types for store operations

use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur in message store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Message body is empty")]
    EmptyBody,
    #[error("Message body too long: {len} characters (max {max})")]
    BodyTooLong { len: usize, max: usize },
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Sender and receiver must be different users")]
    InvalidParticipants,
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] DbErr),
}

impl StoreError {
    /// Whether the input was rejected before touching storage
    pub fn is_validation(&self) -> bool {
        !matches!(self, StoreError::Unavailable(_))
    }
}
