//! Projection error types.

use common::ReservationId;
use thiserror::Error;

/// Errors that can occur when reading a projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The reservation does not exist, or its subject or user is gone.
    #[error("Reservation with id {0} was not found")]
    NotFound(ReservationId),

    /// An error occurred in one of the underlying stores.
    #[error("Store error: {0}")]
    Store(#[from] booking_store::StoreError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
