//! Booking error types.

use booking_store::{EntityKind, StoreError};
use chrono::{DateTime, Utc};
use common::{ReservationId, SubjectId, UserId};
use projections::ProjectionError;
use thiserror::Error;

/// Errors returned by the booking use cases.
///
/// Everything except [`BookingError::Store`] and [`BookingError::Projection`]
/// is a business outcome reported to the caller as is. Those two carry
/// infrastructure failures and are never retried here.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A subject, user or reservation does not exist.
    #[error("{kind} with id {id} was not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// No entity carries the requested name.
    #[error("{kind} named {name:?} was not found")]
    NameNotFound { kind: EntityKind, name: String },

    /// The requested period overlaps existing reservations of the subject.
    #[error("Unable to create reservation: conflict with reservations {conflicting:?}")]
    AlreadyReserved { conflicting: Vec<ReservationId> },

    /// The reservation starts before now, beyond the grace period.
    #[error("Attempt to make a reservation in the past: starts {start}, now {now}")]
    PastReservation {
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// The reservation does not end after it starts.
    #[error("Invalid period: start {start} is not before end {end}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The tag is already attached to the subject.
    #[error("Subject {subject_id} is already tagged with {tag:?}")]
    DuplicateTag { subject_id: SubjectId, tag: String },

    /// Removal found nothing to remove.
    #[error("No active reservations of subject {subject_id} found for user {user_id}")]
    NoActiveReservation {
        user_id: UserId,
        subject_id: SubjectId,
    },

    /// A store failed.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// The read model failed.
    #[error("Projection error: {0}")]
    Projection(ProjectionError),
}

impl BookingError {
    /// Returns true for storage failures rather than business outcomes.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, BookingError::Store(_) | BookingError::Projection(_))
    }

    /// Short label for the rejection reason, used in metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::NotFound { .. } | BookingError::NameNotFound { .. } => "not_found",
            BookingError::AlreadyReserved { .. } => "already_reserved",
            BookingError::PastReservation { .. } => "past_reservation",
            BookingError::InvalidPeriod { .. } => "invalid_period",
            BookingError::DuplicateTag { .. } => "duplicate_tag",
            BookingError::NoActiveReservation { .. } => "no_active_reservation",
            BookingError::Store(_) | BookingError::Projection(_) => "infrastructure",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => BookingError::NotFound { kind, id },
            StoreError::NameNotFound { kind, name } => BookingError::NameNotFound { kind, name },
            StoreError::Conflict(conflicting) => BookingError::AlreadyReserved { conflicting },
            StoreError::InvalidPeriod { start, end } => BookingError::InvalidPeriod { start, end },
            StoreError::DuplicateTag { subject_id, tag } => {
                BookingError::DuplicateTag { subject_id, tag }
            }
            other => BookingError::Store(other),
        }
    }
}

impl From<ProjectionError> for BookingError {
    fn from(e: ProjectionError) -> Self {
        match e {
            ProjectionError::NotFound(id) => BookingError::NotFound {
                kind: EntityKind::Reservation,
                id: id.as_i64(),
            },
            ProjectionError::Store(e) => e.into(),
            other => BookingError::Projection(other),
        }
    }
}

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
