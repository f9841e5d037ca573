//! Booking commands.

use chrono::{DateTime, Utc};
use common::{SubjectId, UserId};

/// Command to reserve a subject for a period.
#[derive(Debug, Clone)]
pub struct CreateReservation {
    /// The user making the reservation.
    pub user_id: UserId,

    /// The subject to reserve.
    pub subject_id: SubjectId,

    /// Start of the reservation, inclusive.
    pub start: DateTime<Utc>,

    /// End of the reservation, exclusive.
    pub end: DateTime<Utc>,
}

impl CreateReservation {
    /// Creates a new CreateReservation command.
    pub fn new(
        user_id: UserId,
        subject_id: SubjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            subject_id,
            start,
            end,
        }
    }
}

/// Command to remove every current and future reservation a user holds on
/// a subject.
#[derive(Debug, Clone, Copy)]
pub struct RemoveReservations {
    pub user_id: UserId,
    pub subject_id: SubjectId,
}

impl RemoveReservations {
    /// Creates a new RemoveReservations command.
    pub fn new(user_id: UserId, subject_id: SubjectId) -> Self {
        Self {
            user_id,
            subject_id,
        }
    }
}

/// Command to add a subject to the catalog.
#[derive(Debug, Clone)]
pub struct CreateSubject {
    /// Human-facing name, used as a lookup key.
    pub name: String,

    /// Tags to attach right after creation.
    pub tags: Vec<String>,
}

impl CreateSubject {
    /// Creates a new CreateSubject command without tags.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
        }
    }

    /// Adds tags to attach after creation.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Command to register a user.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub name: String,
}

impl RegisterUser {
    /// Creates a new RegisterUser command.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
