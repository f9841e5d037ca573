use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{ReservationId, SubjectId, UserId};

/// Truncates a timestamp to whole seconds.
///
/// The relational backend stores timestamps at second precision. Every
/// timestamp entering a store or a query goes through this function, so both
/// backends compare exactly the same values.
pub fn normalize(t: DateTime<Utc>) -> DateTime<Utc> {
    t.trunc_subsecs(0)
}

/// Half-open time window `[start, end)` at second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Creates a period, truncating both ends to whole seconds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: normalize(start),
            end: normalize(end),
        }
    }

    /// True when the period contains no instant at all.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A subject booked by a user for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub subject_id: SubjectId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Reservation {
    /// Creates a reservation with both ends truncated to whole seconds.
    pub fn new(
        id: ReservationId,
        user_id: UserId,
        subject_id: SubjectId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let period = Period::new(start, end);
        Self {
            id,
            user_id,
            subject_id,
            start: period.start,
            end: period.end,
        }
    }

    pub fn period(&self) -> Period {
        Period {
            start: self.start,
            end: self.end,
        }
    }
}

/// An ordered collection of reservations with filtering helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservations(Vec<Reservation>);

impl Reservations {
    pub fn new(reservations: Vec<Reservation>) -> Self {
        Self(reservations)
    }

    /// Keeps only the reservations of one subject.
    pub fn for_subject(self, subject_id: SubjectId) -> Self {
        Self(
            self.0
                .into_iter()
                .filter(|r| r.subject_id == subject_id)
                .collect(),
        )
    }

    /// Keeps only the reservations made by one user.
    pub fn for_user(self, user_id: UserId) -> Self {
        Self(self.0.into_iter().filter(|r| r.user_id == user_id).collect())
    }

    pub fn ids(&self) -> Vec<ReservationId> {
        self.0.iter().map(|r| r.id).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reservation> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Reservation> {
        self.0
    }
}

impl From<Vec<Reservation>> for Reservations {
    fn from(reservations: Vec<Reservation>) -> Self {
        Self(reservations)
    }
}

impl FromIterator<Reservation> for Reservations {
    fn from_iter<I: IntoIterator<Item = Reservation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Reservations {
    type Item = Reservation;
    type IntoIter = std::vec::IntoIter<Reservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Reservations {
    type Item = &'a Reservation;
    type IntoIter = std::slice::Iter<'a, Reservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A bookable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
}

impl Subject {
    pub fn new(id: SubjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An ordered collection of subjects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subjects(Vec<Subject>);

impl Subjects {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self(subjects)
    }

    pub fn ids(&self) -> Vec<SubjectId> {
        self.0.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Subject> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Subject> {
        self.0
    }
}

impl FromIterator<Subject> for Subjects {
    fn from_iter<I: IntoIterator<Item = Subject>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Subjects {
    type Item = Subject;
    type IntoIter = std::vec::IntoIter<Subject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Subjects {
    type Item = &'a Subject;
    type IntoIter = std::slice::Iter<'a, Subject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A user as seen by the booking engine: an identity and a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
