//! Read model trait for joined reservation views.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ReservationId, SubjectId, UserId};
use serde::Serialize;

use crate::Result;

/// A reservation joined with the names of its subject and user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationView {
    pub id: ReservationId,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub user_id: UserId,
    pub user_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Query access to reservations joined with catalog and user data.
///
/// Read models never mutate the stores they read from. Reservations whose
/// subject or user no longer exists are left out of every result.
#[async_trait]
pub trait ReservationReadModel: Send + Sync {
    /// Gets one joined reservation, or `NotFound`.
    async fn get(&self, id: ReservationId) -> Result<ReservationView>;

    /// Reservations active at `at` (`start <= at < end`), ordered by id.
    ///
    /// When `tags` is not empty only reservations of subjects carrying every
    /// one of them are returned.
    async fn active(&self, at: DateTime<Utc>, tags: &[String]) -> Result<Vec<ReservationView>>;
}
