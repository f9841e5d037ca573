use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Period, Reservation, ReservationId, Reservations, Result, Subject, SubjectId, Subjects, User,
    UserId,
};

/// Catalog of bookable subjects and their tags.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait SubjectCatalog: Send + Sync {
    /// Allocates an identity for a new subject.
    async fn next_identity(&self) -> Result<SubjectId>;

    /// Stores a subject. Fails with `AlreadyExists` if the id is taken.
    async fn add(&self, subject: Subject) -> Result<()>;

    /// Retrieves a subject, or `NotFound`.
    async fn get(&self, id: SubjectId) -> Result<Subject>;

    /// Retrieves the first subject (lowest id) with exactly this name.
    async fn get_by_name(&self, name: &str) -> Result<Subject>;

    /// Removes a subject together with its tags, or `NotFound`.
    async fn remove(&self, id: SubjectId) -> Result<()>;

    /// All subjects, ordered by id.
    async fn list(&self) -> Result<Subjects>;

    /// Attaches a tag to a subject.
    ///
    /// Fails with `NotFound` if the subject does not exist and with
    /// `DuplicateTag` if the tag is already attached to it.
    async fn add_tag(&self, id: SubjectId, tag: &str) -> Result<()>;

    /// Tags of a subject in alphabetical order, or `NotFound`.
    async fn get_tags(&self, id: SubjectId) -> Result<Vec<String>>;

    /// Subjects carrying every one of `tags`, ordered by id.
    ///
    /// This is an exact set intersection: a subject tagged `testing` does not
    /// match `test`. Repeated tags count once; an empty tag set matches every
    /// subject.
    async fn get_by_tags(&self, tags: &[String]) -> Result<Subjects>;
}

/// The authoritative set of reservations.
///
/// Timestamps are compared at second precision. Intervals are half-open, so a
/// reservation ending exactly when another starts does not overlap it.
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Allocates an identity for a new reservation.
    async fn next_identity(&self) -> Result<ReservationId>;

    /// Stores a reservation.
    ///
    /// The overlap check and the insert happen atomically per subject: if the
    /// reservation overlaps any stored reservation of the same subject the
    /// call fails with `Conflict` carrying every overlapping id, and nothing
    /// is stored. Empty or inverted periods fail with `InvalidPeriod`.
    async fn add(&self, reservation: Reservation) -> Result<()>;

    /// Retrieves a reservation, or `NotFound`.
    async fn get(&self, id: ReservationId) -> Result<Reservation>;

    /// Removes a reservation, or `NotFound`.
    async fn remove(&self, id: ReservationId) -> Result<()>;

    /// All reservations, ordered by id.
    async fn list(&self) -> Result<Reservations>;

    /// Reservations overlapping `period`, ordered by id.
    ///
    /// An empty or inverted period matches nothing.
    async fn for_period(&self, period: Period) -> Result<Reservations>;

    /// Reservations `user_id` holds on `subject_id` that end after `t`, that
    /// is, still running or yet to start, ordered by id.
    async fn held_after(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        t: DateTime<Utc>,
    ) -> Result<Reservations>;
}

/// Read access to users, plus registration for the front end.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Allocates an identity for a new user.
    async fn next_identity(&self) -> Result<UserId>;

    /// Stores a user. Fails with `AlreadyExists` if the id is taken.
    async fn add(&self, user: User) -> Result<()>;

    /// Retrieves a user, or `NotFound`.
    async fn get(&self, id: UserId) -> Result<User>;
}

/// Extension methods available on every ledger.
#[async_trait]
pub trait ReservationLedgerExt: ReservationLedger {
    /// Reservations of `subject_id` overlapping `period`.
    async fn conflicts_with(&self, subject_id: SubjectId, period: Period) -> Result<Reservations> {
        Ok(self.for_period(period).await?.for_subject(subject_id))
    }
}

// Blanket implementation for all ReservationLedger implementations
impl<T: ReservationLedger + ?Sized> ReservationLedgerExt for T {}
