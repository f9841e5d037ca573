use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{ReservationId, SubjectId};

/// Kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Reservation,
    Subject,
    User,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Reservation => "Reservation",
            EntityKind::Subject => "Subject",
            EntityKind::User => "User",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{kind} with id {id} was not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// No entity carries the requested name.
    #[error("{kind} named {name:?} was not found")]
    NameNotFound { kind: EntityKind, name: String },

    /// An entity with this identity is already stored.
    #[error("{kind} with id {id} already exists")]
    AlreadyExists { kind: EntityKind, id: i64 },

    /// The tag is already attached to the subject.
    #[error("Subject {subject_id} is already tagged with {tag:?}")]
    DuplicateTag { subject_id: SubjectId, tag: String },

    /// The reservation overlaps existing reservations of the same subject.
    #[error("Reservation overlaps existing reservations {0:?}")]
    Conflict(Vec<ReservationId>),

    /// The reservation does not end after it starts.
    #[error("Invalid period: start {start} is not before end {end}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn already_exists(kind: EntityKind, id: impl Into<i64>) -> Self {
        StoreError::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    /// Returns true if this error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::NameNotFound { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
